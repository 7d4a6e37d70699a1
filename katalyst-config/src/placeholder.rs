use crate::error::ConfigError;

/// Resolves a single variable name to its current value, if defined.
///
/// Narrowed to "look up one variable" — the only operation the runtime's
/// `${VAR:default}` substitutor needs. [`EnvVarResolver`] is the default,
/// process-environment backed implementation.
pub trait VarResolver: Send + Sync {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Resolves variables from the process environment.
pub struct EnvVarResolver;

impl VarResolver for EnvVarResolver {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Resolves `${VAR:default}` placeholders in `value` using `resolver`.
///
/// Per an undefined variable with a non-empty default substitutes
/// the default; an undefined variable with an empty default substitutes the
/// empty string; a defined variable always substitutes its value, including
/// when that value is empty. `${VAR}` (no `:default`) is equivalent to
/// `${VAR:}` — an undefined var resolves to the empty string.
///
/// Multiple placeholders in one string are each resolved independently, left
/// to right, non-recursively (a resolved value is never itself re-scanned
/// for further placeholders).
pub fn resolve_placeholders(value: &str, resolver: &dyn VarResolver) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let end = after_open
            .find('}')
            .ok_or_else(|| ConfigError::UnclosedPlaceholder(value.to_string()))?;
        let body = &after_open[..end];

        let (name, default) = match body.split_once(':') {
            Some((name, default)) => (name, default),
            None => (body, ""),
        };

        let resolved = match resolver.lookup(name) {
            Some(defined) => defined,
            None => default.to_string(),
        };
        out.push_str(&resolved);

        rest = &after_open[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
