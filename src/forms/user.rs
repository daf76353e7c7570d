use serde::Deserialize;
use validator::Validate;

use crate::domain::types::{CompanyId, UserEmail, UserName};
use crate::domain::user::NewUser;
use crate::forms::FormError;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserForm {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub email: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

pub struct UserPayload {
    pub name: UserName,
    pub email: UserEmail,
    pub is_active: bool,
}

impl TryFrom<UserForm> for UserPayload {
    type Error = FormError;

    fn try_from(form: UserForm) -> Result<Self, Self::Error> {
        form.validate()?;
        Ok(Self {
            name: UserName::new(form.name).map_err(|_| FormError::InvalidName)?,
            email: UserEmail::new(form.email).map_err(|_| FormError::InvalidEmail)?,
            is_active: form.is_active,
        })
    }
}

impl UserPayload {
    pub fn into_domain(self, company_id: CompanyId) -> NewUser {
        NewUser::new(company_id, self.name, self.email, self.is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        let payload = UserPayload::try_from(UserForm {
            name: "Dana".into(),
            email: " Dana@Example.COM ".into(),
            is_active: true,
        })
        .expect("valid form");
        assert_eq!(payload.email.as_str(), "dana@example.com");
    }

    #[test]
    fn invalid_email_is_rejected() {
        let result = UserPayload::try_from(UserForm {
            name: "Dana".into(),
            email: "not-an-email".into(),
            is_active: true,
        });
        assert!(result.is_err());
    }
}
