//! Grid layout in the `-ms-` model.
//!
//! Only explicit placement has an equivalent there: track lists, numeric line
//! placement and the grid `display` values. Named lines, areas and
//! auto-repetition are left untranslated.

/// `-ms-` declarations to emit ahead of `name: value`, in output order.
pub(super) fn ms_declarations(name: &str, value: &str) -> Vec<String> {
    match name {
        "display" => match value {
            "grid" => vec!["display: -ms-grid".to_owned()],
            "inline-grid" => vec!["display: -ms-inline-grid".to_owned()],
            _ => Vec::new(),
        },
        "grid-template-columns" => tracks(value)
            .map(|t| vec![format!("-ms-grid-columns: {t}")])
            .unwrap_or_default(),
        "grid-template-rows" => tracks(value)
            .map(|t| vec![format!("-ms-grid-rows: {t}")])
            .unwrap_or_default(),
        "grid-column" => placement("column", value),
        "grid-row" => placement("row", value),
        "grid-column-start" => line(value)
            .map(|n| vec![format!("-ms-grid-column: {n}")])
            .unwrap_or_default(),
        "grid-row-start" => line(value)
            .map(|n| vec![format!("-ms-grid-row: {n}")])
            .unwrap_or_default(),
        "grid-column-end" => span(value)
            .map(|n| vec![format!("-ms-grid-column-span: {n}")])
            .unwrap_or_default(),
        "grid-row-end" => span(value)
            .map(|n| vec![format!("-ms-grid-row-span: {n}")])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Track list with `repeat(n, tracks)` rewritten as `(tracks)[n]`.
fn tracks(value: &str) -> Option<String> {
    let unsupported = ["[", "subgrid", "masonry", "auto-fill", "auto-fit"];
    if value == "none" || unsupported.iter().any(|u| value.contains(u)) {
        return None;
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("repeat(") {
        out.push_str(&rest[..start]);
        let args_start = start + "repeat(".len();
        let args_len = closing_paren(&rest[args_start..])?;
        let (count, body) = rest[args_start..args_start + args_len].split_once(',')?;
        let count: u32 = count.trim().parse().ok()?;
        out.push_str(&format!("({})[{count}]", body.trim()));
        rest = &rest[args_start + args_len + 1..];
    }
    out.push_str(rest);
    Some(out)
}

/// Byte offset of the `)` closing an already opened parenthesis.
fn closing_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// `start / end` shorthand as a start line plus a span.
fn placement(axis: &str, value: &str) -> Vec<String> {
    let mut parts = value.split('/').map(str::trim);
    let Some(start) = parts.next().and_then(line) else {
        return Vec::new();
    };

    let mut out = vec![format!("-ms-grid-{axis}: {start}")];
    let length = match parts.next() {
        Some(end) => span(end).or_else(|| line(end).and_then(|end| end.checked_sub(start))),
        None => None,
    };
    if let Some(length) = length.filter(|n| *n > 1) {
        out.push(format!("-ms-grid-{axis}-span: {length}"));
    }
    out
}

/// Positive line number.
fn line(value: &str) -> Option<u32> {
    value.trim().parse().ok().filter(|n| *n > 0)
}

/// Count from `span <n>`.
fn span(value: &str) -> Option<u32> {
    let mut words = value.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some("span"), Some(n), None) => line(n),
        _ => None,
    }
}
