//! Utilidades de presentación para formatear propiedades en consola.

use console::style;

/// Tono del valor mostrado.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tone {
    Normal,
    Success,
    Warning,
    Error,
}

/// Formatea una propiedad con el estilo consistente de MetaHunter.
pub fn format_property(label: &str, value: &str, indent: usize, tone: Tone) -> String {
    let label_styled = style(format!("{}{}", "  ".repeat(indent + 1), label))
        .cyan()
        .bold();
    let arrow = style("→").dim();

    let value_styled = match tone {
        Tone::Success => style(value).green(),
        Tone::Warning => style(value).yellow(),
        Tone::Error => style(value).red(),
        Tone::Normal => style(value).white(),
    };

    format!("{} {} {}", label_styled, arrow, value_styled)
}

pub fn format_heading(title: &str, indent: usize) -> String {
    format!(
        "{}{}",
        "  ".repeat(indent),
        style(format!("▸ {title}")).magenta().bold()
    )
}
