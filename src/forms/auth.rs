//! Login and signup forms
//!
//! These only check presence and password confirmation; username and
//! password rules live in the user service, whose field errors are attached
//! back onto the form by the handlers.

use super::{Form, FormData, FormField, Widget};
use crate::models::CreateUserInput;

pub struct LoginForm;

impl LoginForm {
    pub fn unbound() -> Form {
        Form::new(vec![
            FormField::char("username", "Username").required(),
            FormField::char("password", "Password")
                .widget(Widget::PasswordInput)
                .required(),
        ])
    }

    /// Returns `(username, password)` when both are present
    pub fn bind(data: &FormData) -> Result<(String, String), Form> {
        let mut form = Self::unbound();
        form.bind(data);
        form.check_required(data);

        if form.is_valid() {
            Ok((
                data.value("username").trim().to_string(),
                data.value("password").to_string(),
            ))
        } else {
            Err(form)
        }
    }

    /// Re-rendered form after a failed login, keeping the username
    pub fn failed(data: &FormData, message: &str) -> Form {
        let mut form = Self::unbound();
        form.bind(data);
        form.add_non_field_error(message);
        form
    }
}

pub struct SignupForm;

impl SignupForm {
    pub fn unbound() -> Form {
        Form::new(vec![
            FormField::char("username", "Username")
                .help("Required. 150 characters or fewer. Letters, digits and @/./+/-/_ only.")
                .required(),
            FormField::email("email", "Email address"),
            FormField::char("password1", "Password")
                .widget(Widget::PasswordInput)
                .help("Your password must contain at least 8 characters.")
                .required(),
            FormField::char("password2", "Password confirmation")
                .widget(Widget::PasswordInput)
                .help("Enter the same password as before, for verification.")
                .required(),
        ])
    }

    pub fn bind(data: &FormData) -> Result<CreateUserInput, Form> {
        let mut form = Self::unbound();
        form.bind(data);
        form.check_required(data);

        let password = data.value("password1");
        if !password.is_empty() && password != data.value("password2") {
            form.add_error("password2", "The two password fields didn't match.");
        }

        if !form.is_valid() {
            return Err(form);
        }

        let email = data.value("email").trim();
        Ok(CreateUserInput {
            username: data.value("username").trim().to_string(),
            email: (!email.is_empty()).then(|| email.to_string()),
            password: password.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_requires_both_fields() {
        let form = LoginForm::bind(&FormData::from_pairs([("username", "leo")])).unwrap_err();
        assert!(form.errors().contains_key("password"));
        assert_eq!(form.field("username").unwrap().value, "leo");

        let (username, password) =
            LoginForm::bind(&FormData::from_pairs([("username", " leo "), ("password", "pw")])).unwrap();
        assert_eq!(username, "leo");
        assert_eq!(password, "pw");
    }

    #[test]
    fn test_failed_login_keeps_username_only() {
        let data = FormData::from_pairs([("username", "leo"), ("password", "wrong")]);
        let form = LoginForm::failed(&data, "Bad credentials");

        assert_eq!(form.field("username").unwrap().value, "leo");
        assert_eq!(form.field("password").unwrap().value, "");
        assert!(!form.is_valid());
    }

    #[test]
    fn test_signup_passwords_must_match() {
        let data = FormData::from_pairs([
            ("username", "leo"),
            ("password1", "password123"),
            ("password2", "password124"),
        ]);
        let form = SignupForm::bind(&data).unwrap_err();
        assert!(form.errors().contains_key("password2"));
    }

    #[test]
    fn test_signup_valid() {
        let data = FormData::from_pairs([
            ("username", "leo"),
            ("email", ""),
            ("password1", "password123"),
            ("password2", "password123"),
        ]);
        let input = SignupForm::bind(&data).unwrap();

        assert_eq!(input.username, "leo");
        assert_eq!(input.email, None);
        assert_eq!(input.password, "password123");
    }
}
