use crate::models::CustomerInfo;

const MIN_NAME_LEN: usize = 2;
const MIN_PHONE_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactValidation {
    pub name: bool,
    pub phone: bool,
    pub email: bool,
}

impl ContactValidation {
    pub fn check(info: &CustomerInfo) -> Self {
        Self {
            name: is_valid_name(&info.name),
            phone: is_valid_phone(&info.phone),
            email: is_valid_email(&info.email),
        }
    }

    pub fn all_valid(&self) -> bool {
        self.name && self.phone && self.email
    }
}

pub fn is_valid_name(name: &str) -> bool {
    name.trim().chars().count() >= MIN_NAME_LEN
}

/// Length only; formatting is left to the scheduling backend.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.trim().chars().count() >= MIN_PHONE_LEN
}

/// Loose check: an `@` and a `.` somewhere. Accepts strings such as `a@.`.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    email.contains('@') && email.contains('.')
}

/// First whitespace-separated token, and the remaining tokens joined by single spaces.
pub fn split_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}
