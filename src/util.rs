use gtmpl::{Context, Template, Value};

/// Renders `template` against `scope` into memory, so a failed render never
/// leaves a half-written file behind.
pub fn render(template: &Template, scope: Value) -> Result<Vec<u8>, String> {
    let context = Context::from(scope)?;
    let mut rendered = Vec::new();
    template.execute(&mut rendered, &context)?;
    Ok(rendered)
}
