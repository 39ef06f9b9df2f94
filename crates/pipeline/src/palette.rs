//! Costume color placeholder substitution.
//!
//! Costume text carries literal placeholders such as `[C1]`; the
//! costume's palette binds each placeholder to one of the character's
//! color fields.

use tableau_core::reference::{Character, Costume};

use crate::tokens::replace_tokens;

/// Placeholder -> color bindings for `costume` worn by `character`.
///
/// Palette order is kept; a placeholder listed twice keeps its first
/// position but takes the color of its last entry.
pub fn palette_bindings<'a>(costume: &'a Costume, character: &'a Character) -> Vec<(&'a str, &'a str)> {
    let mut bindings: Vec<(&str, &str)> = Vec::with_capacity(costume.color_palette.len());
    for item in &costume.color_palette {
        if item.placeholder.is_empty() {
            continue;
        }
        let color = character.color(item.color_ref);
        match bindings.iter_mut().find(|(ph, _)| *ph == item.placeholder) {
            Some(existing) => existing.1 = color,
            None => bindings.push((item.placeholder.as_str(), color)),
        }
    }
    bindings
}

/// Replace the costume's palette placeholders in `text` with the
/// character's colors.
///
/// Placeholders absent from the palette are left verbatim.
pub fn substitute_colors(text: &str, costume: &Costume, character: &Character) -> String {
    replace_tokens(text, &palette_bindings(costume, character))
}
