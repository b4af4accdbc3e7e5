//! Vendor prefixing in source order.
//!
//! lightningcss only adds prefixes while minifying a whole sheet, which also
//! regroups declarations. Here every declaration is run through it on its own,
//! so the prefixed forms land directly above the declaration they belong to and
//! the block keeps its authored order. When the targets include Internet
//! Explorer, grid declarations also get their `-ms-` translation.

use std::sync::{Arc, RwLock};

use lightningcss::declaration::DeclarationBlock;
use lightningcss::error::{Error, ParserError};
use lightningcss::printer::PrinterOptions;
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleAttribute, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::vendor_prefix::VendorPrefix;

use super::grid;

/// Prefixes stylesheets for one set of browser targets.
#[derive(Debug, Clone, Copy)]
pub(super) struct Prefixer {
    targets: Targets,
    ms_grid: bool,
    keyframes: VendorPrefix,
}

impl Prefixer {
    pub(super) fn new(browsers: Option<Browsers>) -> Self {
        let targets = Targets {
            browsers,
            ..Targets::default()
        };
        Self {
            targets,
            ms_grid: browsers.is_some_and(|b| b.ie.is_some()),
            keyframes: keyframes_prefix(targets),
        }
    }

    /// Prefix `css`, returning expanded (unminified) output.
    ///
    /// Declarations the parser rejects are dropped with a warning; the rest of
    /// the sheet is still emitted.
    pub(super) fn run(&self, css: &str) -> Result<String, String> {
        // Declared first: the rewritten blocks borrow from it
        let expanded: Vec<String>;
        let warnings = Arc::new(RwLock::new(Vec::new()));
        let mut sheet = StyleSheet::parse(
            css,
            ParserOptions {
                error_recovery: true,
                warnings: Some(Arc::clone(&warnings)),
                ..ParserOptions::default()
            },
        )
        .map_err(|e| e.to_string())?;
        report_warnings(&warnings);

        let mut blocks = Vec::new();
        let mut failure = None;
        for_each_block(&mut sheet.rules, &mut |block| match self.expand(block) {
            Ok(text) => blocks.push(text),
            Err(err) => {
                failure.get_or_insert(err);
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
        expanded = blocks;

        let mut texts = expanded.iter();
        let mut failure = None;
        for_each_block(&mut sheet.rules, &mut |block| {
            let Some(text) = texts.next() else {
                return;
            };
            let options = ParserOptions {
                error_recovery: true,
                ..ParserOptions::default()
            };
            match DeclarationBlock::parse_string(text, options) {
                Ok(parsed) => *block = parsed,
                Err(err) => {
                    failure.get_or_insert(Error::from(err, String::new()).to_string());
                }
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }

        prefix_keyframes(&mut sheet.rules, self.keyframes);

        sheet
            .to_css(PrinterOptions::default())
            .map(|result| result.code)
            .map_err(|e| e.to_string())
    }

    /// Serialize `block` with every declaration expanded in place.
    fn expand(&self, block: &DeclarationBlock<'_>) -> Result<String, String> {
        let mut out = Vec::with_capacity(block.len());
        for (property, important) in block.iter() {
            if self.ms_grid {
                let id = property.property_id();
                let value = property
                    .value_to_css_string(PrinterOptions::default())
                    .map_err(|e| e.to_string())?;
                for declaration in grid::ms_declarations(id.name(), &value) {
                    out.push(if important {
                        format!("{declaration} !important")
                    } else {
                        declaration
                    });
                }
            }

            let declaration = property
                .to_css_string(important, PrinterOptions::default())
                .map_err(|e| e.to_string())?;
            let prefixed = self.prefixed(&declaration)?;
            if !prefixed.is_empty() {
                out.push(prefixed);
            }
        }
        Ok(out.join("; "))
    }

    /// Vendor-prefixed forms of a single declaration, followed by the
    /// declaration itself.
    fn prefixed(&self, declaration: &str) -> Result<String, String> {
        let mut attribute = StyleAttribute::parse(declaration, ParserOptions::default())
            .map_err(|e| e.to_string())?;
        attribute.minify(MinifyOptions {
            targets: self.targets,
            ..MinifyOptions::default()
        });
        attribute
            .to_css(PrinterOptions {
                targets: self.targets,
                ..PrinterOptions::default()
            })
            .map(|result| result.code)
            .map_err(|e| e.to_string())
    }
}

/// Visit every declaration block in document order.
fn for_each_block<'i>(
    rules: &mut CssRuleList<'i>,
    visit: &mut dyn FnMut(&mut DeclarationBlock<'i>),
) {
    for rule in &mut rules.0 {
        match rule {
            CssRule::Style(style) => {
                visit(&mut style.declarations);
                for_each_block(&mut style.rules, visit);
            }
            CssRule::Media(media) => for_each_block(&mut media.rules, visit),
            CssRule::Supports(supports) => for_each_block(&mut supports.rules, visit),
            CssRule::Keyframes(keyframes) => {
                for keyframe in &mut keyframes.keyframes {
                    visit(&mut keyframe.declarations);
                }
            }
            _ => {}
        }
    }
}

/// Give unprefixed `@keyframes` rules the prefixes the targets need.
fn prefix_keyframes(rules: &mut CssRuleList<'_>, prefix: VendorPrefix) {
    for rule in &mut rules.0 {
        match rule {
            CssRule::Keyframes(keyframes) if keyframes.vendor_prefix == VendorPrefix::None => {
                keyframes.vendor_prefix = prefix;
            }
            CssRule::Media(media) => prefix_keyframes(&mut media.rules, prefix),
            CssRule::Supports(supports) => prefix_keyframes(&mut supports.rules, prefix),
            _ => {}
        }
    }
}

/// Prefixes lightningcss gives `@keyframes` for `targets`.
fn keyframes_prefix(targets: Targets) -> VendorPrefix {
    let Ok(mut sheet) = StyleSheet::parse(
        "@keyframes k { from { opacity: 0 } }",
        ParserOptions::default(),
    ) else {
        return VendorPrefix::None;
    };
    let options = MinifyOptions {
        targets,
        ..MinifyOptions::default()
    };
    if sheet.minify(options).is_err() {
        return VendorPrefix::None;
    }

    sheet
        .rules
        .0
        .iter()
        .filter_map(|rule| match rule {
            CssRule::Keyframes(keyframes) => Some(keyframes.vendor_prefix),
            _ => None,
        })
        .fold(VendorPrefix::None, |acc, prefix| acc | prefix)
}

fn report_warnings(warnings: &RwLock<Vec<Error<ParserError<'_>>>>) {
    let Ok(warnings) = warnings.read() else {
        return;
    };
    for warning in warnings.iter() {
        tracing::warn!(warning = %warning, "Skipped invalid CSS");
    }
}
