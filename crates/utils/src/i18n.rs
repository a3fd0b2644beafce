//! English and Portuguese user-facing messages.
//!
//! The request locale is bound with [`Locale::scope`] for the lifetime of a
//! request; [`Message`]'s `Display` renders in whatever locale is in scope and
//! falls back to English outside of one.

use std::{fmt, future::Future};

tokio::task_local! {
    static LOCALE: Locale;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    Pt,
}

impl Locale {
    /// Language-only match: `pt`, `pt-BR` and `PT_pt` are all Portuguese
    pub fn parse(tag: &str) -> Option<Self> {
        let language = tag.trim().split(['-', '_']).next()?;
        if language.eq_ignore_ascii_case("en") {
            Some(Locale::En)
        } else if language.eq_ignore_ascii_case("pt") {
            Some(Locale::Pt)
        } else {
            None
        }
    }

    /// First supported language of an `Accept-Language` value, in listed order
    pub fn from_accept_language(header: &str) -> Option<Self> {
        header
            .split(',')
            .filter_map(|entry| entry.split(';').next())
            .find_map(Locale::parse)
    }

    pub fn current() -> Self {
        LOCALE.try_with(|locale| *locale).unwrap_or_default()
    }

    /// Run `f` with `self` as the current locale
    pub async fn scope<F: Future>(self, f: F) -> F::Output {
        LOCALE.scope(self, f).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    RequiredFields(String),
    EmailRequired,
    InvalidEmail,
    EmailAlreadyInUse,
    CompanyRequired,
    CompanyNotFound(i64),
    CnpjAlreadyRegistered,
    PasswordRequired,
    PasswordTooShort(usize),
    CloneRequires { model: String, fields: String },
    CannotDeleteSelf,
    ItemNotFound { model: String, id: i64 },
    DuplicateValue,
    RelatedRecords,
    InvalidCredentials,
    TooManyRequests,
}

impl Message {
    pub fn text(&self, locale: Locale) -> String {
        use Message::*;
        match (locale, self) {
            (Locale::En, RequiredFields(labels)) => format!("Required fields missing: {labels}"),
            (Locale::Pt, RequiredFields(labels)) => {
                format!("Campos obrigatórios não preenchidos: {labels}")
            }
            (Locale::En, EmailRequired) => "Email is required".into(),
            (Locale::Pt, EmailRequired) => "O email é obrigatório".into(),
            (Locale::En, InvalidEmail) => "Invalid email format".into(),
            (Locale::Pt, InvalidEmail) => "Formato de email inválido".into(),
            (Locale::En, EmailAlreadyInUse) => "Email already in use".into(),
            (Locale::Pt, EmailAlreadyInUse) => "Email já está em uso".into(),
            (Locale::En, CompanyRequired) => "Company is required".into(),
            (Locale::Pt, CompanyRequired) => "A empresa é obrigatória".into(),
            (Locale::En, CompanyNotFound(id)) => format!("Company {id} does not exist"),
            (Locale::Pt, CompanyNotFound(id)) => format!("Empresa {id} não encontrada"),
            (Locale::En, CnpjAlreadyRegistered) => "CNPJ already registered".into(),
            (Locale::Pt, CnpjAlreadyRegistered) => "CNPJ já cadastrado".into(),
            (Locale::En, PasswordRequired) => "Password is required".into(),
            (Locale::Pt, PasswordRequired) => "A senha é obrigatória".into(),
            (Locale::En, PasswordTooShort(min)) => {
                format!("Password must be at least {min} characters")
            }
            (Locale::Pt, PasswordTooShort(min)) => {
                format!("A senha deve ter pelo menos {min} caracteres")
            }
            (Locale::En, CloneRequires { model, fields }) => {
                format!("Cloning a {model} requires values for: {fields}")
            }
            (Locale::Pt, CloneRequires { model, fields }) => {
                format!("Para clonar {model} informe valores para: {fields}")
            }
            (Locale::En, CannotDeleteSelf) => "You cannot delete your own account".into(),
            (Locale::Pt, CannotDeleteSelf) => "Você não pode excluir sua própria conta".into(),
            (Locale::En, ItemNotFound { model, id }) => format!("{model} with ID {id} not found"),
            (Locale::Pt, ItemNotFound { model, id }) => {
                format!("{model} com ID {id} não encontrado")
            }
            (Locale::En, DuplicateValue) => {
                "A record with the same unique value already exists".into()
            }
            (Locale::Pt, DuplicateValue) => "Já existe um registro com o mesmo valor único".into(),
            (Locale::En, RelatedRecords) => {
                "The operation conflicts with related records".into()
            }
            (Locale::Pt, RelatedRecords) => "A operação conflita com registros relacionados".into(),
            (Locale::En, InvalidCredentials) => "Invalid email or password".into(),
            (Locale::Pt, InvalidCredentials) => "Email ou senha inválidos".into(),
            (Locale::En, TooManyRequests) => "Too many requests, please try again later".into(),
            (Locale::Pt, TooManyRequests) => {
                "Muitas requisições, tente novamente mais tarde".into()
            }
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text(Locale::current()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language_tags() {
        assert_eq!(Locale::parse("pt-BR"), Some(Locale::Pt));
        assert_eq!(Locale::parse("EN_us"), Some(Locale::En));
        assert_eq!(Locale::parse("fr"), None);
        assert_eq!(
            Locale::from_accept_language("fr-FR, pt-BR;q=0.9, en;q=0.8"),
            Some(Locale::Pt)
        );
        assert_eq!(Locale::from_accept_language("de, *;q=0.5"), None);
    }

    #[tokio::test]
    async fn test_display_follows_scoped_locale() {
        assert_eq!(Message::EmailAlreadyInUse.to_string(), "Email already in use");
        let text = Locale::Pt
            .scope(async { Message::CnpjAlreadyRegistered.to_string() })
            .await;
        assert_eq!(text, "CNPJ já cadastrado");
        assert_eq!(Locale::current(), Locale::En);
    }
}
