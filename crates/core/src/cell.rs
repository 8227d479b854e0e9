use serde::{Deserialize, Serialize};

/// A raw scalar read from a source document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Classify extracted text: blank → Empty, a plain number literal → Number,
    /// anything else → Text (kept verbatim, including surrounding whitespace).
    ///
    /// A literal becomes a Number only when [`CellValue::display`] gives the
    /// same text back, so codes like `"001"` or `"6.10"` stay Text and key the
    /// same way as a text cell from a spreadsheet.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        // f64::from_str accepts "inf"/"NaN"; those stay text
        if trimmed.bytes().any(|b| b.is_ascii_digit()) {
            if let Ok(n) = trimmed.parse::<f64>() {
                if n.is_finite() && format_number(n) == trimmed {
                    return CellValue::Number(n);
                }
            }
        }
        CellValue::Text(raw.to_string())
    }

    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// String form used for display and for key normalization.
    /// Integral numbers print without a fractional part.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}
