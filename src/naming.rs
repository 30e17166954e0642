//! Column and field name normalization.
//!
//! The underscore-separated form (`user_id`) is the canonical form used when
//! matching columns to fields. The camel-case form is derived from it for
//! display and the two conversions are not inverses: runs of capitals are
//! kept together, so `"ABTest"` becomes `"abtest"` and comes back as
//! `"Abtest"`.

/// Converts a camel-case name to lower-case underscore-separated form.
///
/// An underscore is inserted before an uppercase character unless it is the
/// first character or follows another uppercase character.
///
/// ```
/// use hsql::naming::camel_to_underscore;
///
/// assert_eq!(camel_to_underscore("userID"), "user_id");
/// assert_eq!(camel_to_underscore("UserInfo"), "user_info");
/// assert_eq!(camel_to_underscore("ABTest"), "abtest");
/// ```
pub fn camel_to_underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_upper = false;

    for (i, c) in name.chars().enumerate() {
        let upper = c.is_uppercase();
        if upper {
            if i != 0 && !prev_upper {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        prev_upper = upper;
    }

    out
}

/// Converts an underscore-separated name to upper camel case.
///
/// Each underscore-delimited word gets its first character upper-cased; the
/// rest of the word is kept as-is.
///
/// ```
/// use hsql::naming::underscore_to_camel;
///
/// assert_eq!(underscore_to_camel("user_id"), "UserId");
/// assert_eq!(underscore_to_camel("abtest"), "Abtest");
/// ```
pub fn underscore_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());

    for word in name.split('_') {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }

    out
}

/// Removes every underscore from `name`.
pub fn strip_underscores(name: &str) -> String {
    name.chars().filter(|c| *c != '_').collect()
}

/// Compares a column against a field name in canonical underscore form.
pub(crate) fn normalized_eq(column: &str, field: &str) -> bool {
    camel_to_underscore(column) == camel_to_underscore(field)
}

/// Compares a column against a field name ignoring underscore placement.
pub(crate) fn stripped_eq(column: &str, field: &str) -> bool {
    strip_underscores(column).to_lowercase() == strip_underscores(field).to_lowercase()
}
