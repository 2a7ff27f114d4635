//! Profile editing.
//!
//! A [`ProfileDraft`] holds the editable fields of a loaded
//! [`UserProfile`] as the user types them. [`ProfileDraft::diff`] validates
//! the draft and produces a [`ProfileUpdate`] carrying only the fields that
//! changed, so an untouched form never reaches the API.

use grocer_core::{Cpf, Phone, digits_only};

use crate::api::{ProfileUpdate, UserProfile};
use crate::error::ProfileError;

/// Longest first or last name the storefront stores.
pub const MAX_NAME_LEN: usize = 15;

const GIVEN_NAME: &str = "Given name";
const FAMILY_NAME: &str = "Family name";

/// Editable copy of the profile fields.
///
/// CPF and phone are kept in their display masks; comparison with the
/// loaded profile and the outgoing update use bare digits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    /// First name as typed.
    pub given_name: String,
    /// Last name as typed.
    pub family_name: String,
    /// CPF in `XXX.XXX.XXX-XX` form (possibly partial).
    pub cpf: String,
    /// Phone in `(DD) XXXX-XXXX` form (possibly partial).
    pub phone: String,
}

impl ProfileDraft {
    /// Start editing from the loaded profile.
    #[must_use]
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            given_name: profile.given_name.clone(),
            family_name: profile.family_name.clone(),
            cpf: Cpf::format_partial(&profile.cpf),
            phone: Phone::format_partial(&profile.number),
        }
    }

    /// Accept a CPF keystroke, re-applying the mask.
    ///
    /// Input with more than 11 digits is ignored.
    pub fn set_cpf(&mut self, input: &str) {
        if digits_only(input).len() <= Cpf::LEN {
            self.cpf = Cpf::format_partial(input);
        }
    }

    /// Accept a phone keystroke, re-applying the mask.
    ///
    /// Input with more than 11 digits is ignored.
    pub fn set_phone(&mut self, input: &str) {
        if digits_only(input).len() <= 11 {
            self.phone = Phone::format_partial(input);
        }
    }

    /// Validate the draft and collect the fields that differ from `original`.
    ///
    /// Names must be non-blank letters and spaces. A CPF or phone may be
    /// cleared; when present it must be valid.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure, or `ProfileError::NoChanges`
    /// when nothing differs.
    pub fn diff(&self, original: &UserProfile) -> Result<ProfileUpdate, ProfileError> {
        let given_name = validate_name(GIVEN_NAME, &self.given_name)?;
        let family_name = validate_name(FAMILY_NAME, &self.family_name)?;

        let cpf = digits_only(&self.cpf);
        if !cpf.is_empty() {
            Cpf::parse(&cpf)?;
        }
        let phone = digits_only(&self.phone);
        if !phone.is_empty() {
            Phone::parse(&phone)?;
        }

        let update = ProfileUpdate {
            given_name: changed(given_name, original.given_name.trim()),
            family_name: changed(family_name, original.family_name.trim()),
            cpf: changed(&cpf, &digits_only(&original.cpf)),
            number: changed(&phone, &digits_only(&original.number)),
        };
        if update.is_empty() {
            return Err(ProfileError::NoChanges);
        }
        Ok(update)
    }
}

fn validate_name<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ProfileError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ProfileError::EmptyName(field));
    }
    if !value.chars().all(|c| c.is_alphabetic() || c == ' ') {
        return Err(ProfileError::NameCharacters(field));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(ProfileError::NameTooLong(field, MAX_NAME_LEN));
    }
    Ok(value)
}

fn changed(new: &str, old: &str) -> Option<String> {
    (new != old).then(|| new.to_owned())
}
