//! Embedded page templates
//!
//! Templates are bundled in the binary and compiled once into a shared
//! tera instance on first use.

use once_cell::sync::Lazy;
use serde::Serialize;
use tera::{Context, Tera};

/// Embedded template source
pub struct PageTemplate {
    pub name: &'static str,
    pub source: &'static str,
}

/// All page templates embedded in the binary
/// Templates are stored in templates/ at the crate root
pub static PREDEFINED_TEMPLATES: &[PageTemplate] = &[
    PageTemplate {
        name: "base.html",
        source: include_str!("../../templates/base.html"),
    },
    PageTemplate {
        name: "_form_errors.html",
        source: include_str!("../../templates/_form_errors.html"),
    },
    PageTemplate {
        name: "generic_message.html",
        source: include_str!("../../templates/generic_message.html"),
    },
    PageTemplate {
        name: "organizations.html",
        source: include_str!("../../templates/organizations.html"),
    },
    PageTemplate {
        name: "organization.html",
        source: include_str!("../../templates/organization.html"),
    },
    PageTemplate {
        name: "users.html",
        source: include_str!("../../templates/users.html"),
    },
    PageTemplate {
        name: "new_organization.html",
        source: include_str!("../../templates/new_organization.html"),
    },
    PageTemplate {
        name: "edit_organization.html",
        source: include_str!("../../templates/edit_organization.html"),
    },
    PageTemplate {
        name: "login.html",
        source: include_str!("../../templates/login.html"),
    },
];

static TERA: Lazy<Result<Tera, String>> = Lazy::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(PREDEFINED_TEMPLATES.iter().map(|t| (t.name, t.source)))
        .map_err(|e| format!("{:?}", e))?;
    Ok(tera)
});

fn engine() -> tera::Result<&'static Tera> {
    TERA.as_ref()
        .map_err(|e| tera::Error::msg(format!("templates failed to compile: {}", e)))
}

/// Render a named template with a prepared context
pub fn render(name: &str, context: &Context) -> tera::Result<String> {
    engine()?.render(name, context)
}

/// Render a named template from any serializable context value
pub fn render_value<T: Serialize>(name: &str, value: &T) -> tera::Result<String> {
    render(name, &Context::from_serialize(value)?)
}

#[derive(Serialize)]
struct MessageViewer<'a> {
    username: &'a str,
}

/// Render the page used for every user-facing rejection
pub fn generic_message(title: &str, message: &str, viewer: Option<&str>) -> tera::Result<String> {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("message", message);
    context.insert("user", &viewer.map(|username| MessageViewer { username }));
    render("generic_message.html", &context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_compile() {
        let tera = engine().unwrap();
        for template in PREDEFINED_TEMPLATES {
            assert!(tera.get_template_names().any(|name| name == template.name));
        }
    }

    #[test]
    fn test_generic_message_escapes_text() {
        let html = generic_message("No such organization", "key \"<b>\"", None).unwrap();
        assert!(html.contains("<title>No such organization</title>"));
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_generic_message_shows_viewer() {
        let html = generic_message("Can't edit organization", "nope", Some("carol")).unwrap();
        assert!(html.contains("<span class=\"user\">carol</span>"));
        assert!(!html.contains(">Log in</a>"));

        let anonymous = generic_message("No such organization", "nope", None).unwrap();
        assert!(anonymous.contains(">Log in</a>"));
    }
}
