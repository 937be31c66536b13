//! Stable categorical colors for symbols and message types.

use std::collections::HashMap;

/// Qualitative palette, cycled when there are more values than colors.
pub const DEFAULT_COLORS: [&str; 10] = [
    "#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A", "#19D3F3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

/// Value -> color map fixed at construction.
///
/// Colors are handed out in first-appearance order, so the same distinct
/// values always get the same colors regardless of how often they repeat.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    order: Vec<String>,
    colors: HashMap<String, &'static str>,
}

impl Palette {
    pub fn assign<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut p = Palette::default();
        for v in values {
            let v = v.as_ref();
            if p.colors.contains_key(v) {
                continue;
            }
            let color = DEFAULT_COLORS[p.order.len() % DEFAULT_COLORS.len()];
            p.colors.insert(v.to_string(), color);
            p.order.push(v.to_string());
        }
        p
    }

    pub fn color_of(&self, value: &str) -> Option<&'static str> {
        self.colors.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(value, color)` pairs in assignment order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &'static str)> + '_ {
        self.order
            .iter()
            .filter_map(|v| self.colors.get(v).map(|c| (v.as_str(), *c)))
    }
}
