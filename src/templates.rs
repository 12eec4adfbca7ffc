use crate::models::{Contact, Template};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("valid placeholder regex"));

/// Substitutes `{{key}}` placeholders. Keys with no value are left as written.
pub fn render(text: &str, values: &HashMap<String, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(text, |captures: &Captures<'_>| match values.get(&captures[1]) {
            Some(value) => value.clone(),
            None => captures[0].to_string(),
        })
        .into_owned()
}

pub fn placeholders(text: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for captures in PLACEHOLDER_RE.captures_iter(text) {
        let key = captures[1].to_string();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

pub fn contact_values(contact: &Contact) -> HashMap<String, String> {
    let mut values = HashMap::new();
    values.insert("name".to_string(), contact.name.clone());
    values.insert("company".to_string(), contact.company.clone());
    if let Some(email) = &contact.email {
        values.insert("email".to_string(), email.clone());
    }
    values
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub subject: String,
    pub body: String,
}

pub fn render_for_contact(template: &Template, contact: &Contact) -> RenderedTemplate {
    let values = contact_values(contact);
    RenderedTemplate {
        subject: render(&template.subject, &values),
        body: render(&template.body, &values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactStatus, TemplateCategory};
    use chrono::Utc;

    #[test]
    fn known_placeholders_are_replaced() {
        let mut values = HashMap::new();
        values.insert("name".to_string(), "John".to_string());
        let rendered = render("Hi {{name}}, about {{ deal }} and {{name }}", &values);
        assert_eq!(rendered, "Hi John, about {{ deal }} and John");
    }

    #[test]
    fn placeholders_are_listed_once_in_order() {
        assert_eq!(
            placeholders("{{company}} {{name}} {{company}}"),
            vec!["company".to_string(), "name".to_string()]
        );
    }

    #[test]
    fn renders_subject_and_body_for_contact() {
        let now = Utc::now();
        let contact = Contact {
            id: "c1".to_string(),
            org_id: "org_a".to_string(),
            name: "John Smith".to_string(),
            email: None,
            phone: None,
            company: "Acme Corp".to_string(),
            tags: Vec::new(),
            notes: String::new(),
            status: ContactStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let template = Template {
            id: "t1".to_string(),
            org_id: "org_a".to_string(),
            name: "Intro".to_string(),
            subject: "Hello from us, {{company}}".to_string(),
            body: "Hi {{name}}, reach me at {{email}}".to_string(),
            category: TemplateCategory::Introduction,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let rendered = render_for_contact(&template, &contact);
        assert_eq!(rendered.subject, "Hello from us, Acme Corp");
        assert_eq!(rendered.body, "Hi John Smith, reach me at {{email}}");
    }
}
