//! `${name}` variable expansion for commands, log messages and bodies.

use autorule_domain::id::MAX_KEY_LEN;
use autorule_domain::text::truncate_in_place;

use crate::ports::VariableStore;

/// Replace every `${name}` token in `input` with the variable's value.
///
/// Unknown names and unterminated tokens are kept literally. The result is
/// cut to `max_len` bytes, which may leave a partial token at the end.
pub fn expand_variables<V: VariableStore + ?Sized>(input: &str, store: &V, max_len: usize) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let token = &rest[start..];
        let Some(end) = token.find('}') else {
            out.push_str(token);
            rest = "";
            break;
        };
        let name = &token[2..end];
        match lookup(name, store) {
            Some(rendered) => out.push_str(&rendered),
            None => out.push_str(&token[..=end]),
        }
        rest = &token[end + 1..];
    }
    out.push_str(rest);

    truncate_in_place(&mut out, max_len);
    out
}

fn lookup<V: VariableStore + ?Sized>(name: &str, store: &V) -> Option<String> {
    if name.is_empty() || name.len() > MAX_KEY_LEN {
        return None;
    }
    store.get(name).map(|value| value.to_string())
}
