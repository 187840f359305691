use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Convenciones de formato que se pasan explícitamente al normalizador.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormatOptions {
    pub decimal_separator: char,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
        }
    }
}

impl FormatOptions {
    fn localize(&self, rendered: String) -> String {
        if self.decimal_separator == '.' {
            rendered
        } else {
            rendered.replace('.', &self.decimal_separator.to_string())
        }
    }
}

pub fn format_size(bytes: u64, options: &FormatOptions) -> String {
    const KIB: f64 = 1024.0;
    let value = bytes as f64;

    let rendered = if value < KIB {
        format!("{bytes} B")
    } else if value < KIB * KIB {
        format!("{:.1} KB", value / KIB)
    } else if value < KIB * KIB * KIB {
        format!("{:.2} MB", value / (KIB * KIB))
    } else {
        format!("{:.2} GB", value / (KIB * KIB * KIB))
    };
    options.localize(rendered)
}

/// Tiempo de exposición como fracción recíproca (`1/250s`).
pub fn format_exposure_time(seconds: f64, options: &FormatOptions) -> Option<String> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    if seconds < 1.0 {
        Some(format!("1/{}s", (1.0 / seconds).round()))
    } else {
        Some(options.localize(format!("{}s", trim_decimal(seconds))))
    }
}

pub fn format_f_number(value: f64, options: &FormatOptions) -> Option<String> {
    positive(value).map(|value| options.localize(format!("f/{}", trim_decimal(value))))
}

pub fn format_focal_length(millimeters: f64, options: &FormatOptions) -> Option<String> {
    positive(millimeters).map(|value| options.localize(format!("{}mm", trim_decimal(value))))
}

/// Tamaño de página en puntos (`595 x 842 pt`).
pub fn format_page_size(width: f64, height: f64, options: &FormatOptions) -> String {
    options.localize(format!("{} x {} pt", trim_decimal(width), trim_decimal(height)))
}

/// Duración como `minutos:segundos` con los segundos rellenados a dos cifras.
pub fn format_duration(seconds: f64) -> Option<String> {
    let total = positive(seconds)?.floor() as u64;
    if total == 0 {
        return None;
    }
    Some(format!("{}:{:02}", total / 60, total % 60))
}

pub fn format_bitrate(bits_per_second: f64) -> Option<String> {
    let kbps = (positive(bits_per_second)? / 1000.0).round();
    if kbps < 1.0 {
        return None;
    }
    Some(format!("{kbps} kbps"))
}

pub fn format_sample_rate(hertz: u32) -> Option<String> {
    (hertz > 0).then(|| format!("{hertz} Hz"))
}

pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Redondea a dos decimales y elimina ceros sobrantes (`2.80` → `2.8`).
pub fn trim_decimal(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded}")
}

fn positive(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}
