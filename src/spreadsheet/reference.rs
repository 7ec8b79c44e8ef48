//! Conversions between A1-style references and 0-based indexes.

/// Converts column letters (e.g. "A", "AB") to a 0-based column index.
pub fn col_to_index(col: &str) -> Option<usize> {
    if col.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for char in col.chars() {
        if !char.is_ascii_alphabetic() {
            return None;
        }
        let digit = (char.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

/// Converts a 1-based row number string to a 0-based row index.
pub fn row_to_index(row: &str) -> Option<usize> {
    row.parse::<usize>().ok().filter(|row| *row > 0).map(|row| row - 1)
}

/// Converts a 0-based column index to column letters.
pub fn index_to_col(col: usize) -> String {
    let mut column = col + 1;
    let mut letters = String::new();
    while column > 0 {
        column -= 1;
        letters.insert(0, (b'A' + (column % 26) as u8) as char);
        column /= 26;
    }
    letters
}

/// Returns the A1-style reference (e.g. "B3") of a 0-based (row, col) pair.
pub fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col(col), row + 1)
}

/// Parses an A1-style reference into a 0-based (row, col) pair.
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|char: char| char.is_ascii_digit())?;
    let (col, row) = reference.split_at(split);
    Some((row_to_index(row)?, col_to_index(col)?))
}
