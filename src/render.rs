use crate::enrich::PopulatedConfiguration;
use crate::error::Result;
use tera::{Context, Tera};

const INDEX_TEMPLATE_NAME: &str = "index.html";
const INDEX_TEMPLATE: &str = include_str!("../templates/index.html.tera");

/// Renders the portfolio page from a populated configuration
#[derive(Debug)]
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Compiles the embedded page template
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.set_escape_fn(escape_markup);
        tera.add_raw_template(INDEX_TEMPLATE_NAME, INDEX_TEMPLATE)?;
        Ok(Self { tera })
    }

    /// Produces the full HTML document, with the configuration embedded for
    /// client-side hydration
    pub fn render_page(&self, configuration: &PopulatedConfiguration) -> Result<String> {
        let mut context = Context::new();
        context.insert("configuration", configuration);
        context.insert("configuration_json", &script_json(configuration)?);
        Ok(self.tera.render(INDEX_TEMPLATE_NAME, &context)?)
    }
}

// Tera's escaper minus its rewrite of '/'.
fn escape_markup(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// JSON that is safe to inline in a `<script>` element
fn script_json(configuration: &PopulatedConfiguration) -> Result<String> {
    let json = serde_json::to_string(configuration)?;
    Ok(json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}
