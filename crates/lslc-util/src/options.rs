//! Compiler option set.
//!
//! Options are plain booleans. They can be set from the command line
//! (`-O +name,-name`), from the embedding API, or from inline
//! `#pragma OPT ±name` directives while lexing, so the whole set lives in
//! one struct that the lexer owns and the later phases read.

/// The toggle set controlling language extensions and optimizations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// Allow full expressions as global variable initializers.
    pub extendedglobalexpr: bool,
    /// `(type)` binds as a prefix unary operator.
    pub extendedtypecast: bool,
    /// Enable `|= &= ^= <<= >>=`.
    pub extendedassignment: bool,
    /// Materialize every implicit cast as an explicit cast node.
    pub explicitcast: bool,
    /// Permit `string + key` and `key + string`.
    pub allowkeyconcat: bool,
    /// Adjacent string literals concatenate.
    pub allowmultistrings: bool,
    /// Honor `#` directives during tokenization.
    pub processpre: bool,
    /// Enable `switch`/`case`/`default`.
    pub enableswitch: bool,
    /// Enable `break`/`continue` in loops.
    pub breakcont: bool,
    /// Error if a `switch` lacks `default:`.
    pub errmissingdefault: bool,
    /// Allow `list[idx] = value`.
    pub lazylists: bool,
    /// Permit same-named labels in sibling scopes (auto-rename).
    pub duplabels: bool,
    /// Globally rename identifiers for size.
    pub shrinknames: bool,
    /// A later function definition overrides an earlier one with the
    /// same name.
    pub funcoverride: bool,
    /// Honor `inline` hints on user functions.
    pub inline: bool,
    /// Master optimization switch. Also makes the parser reject a label
    /// as the only child of a control construct.
    pub optimize: bool,
    /// Machine-parseable error format.
    pub emap: bool,
    /// Treat language constants as ordinary variables; disable the
    /// `TRUE`/`FALSE` keywords.
    pub prettify: bool,

    // Optimization pass toggles, only honored when `optimize` is set.
    /// Constant folding and library-call rewrites.
    pub constfold: bool,
    /// Dead code removal.
    pub dcr: bool,
    /// Rewrite list literals as addition chains in the last pass.
    pub optlistadd: bool,
    /// Rewrite `llGetListLength(e)` as `(e != [])`.
    pub listlength: bool,
}

impl Options {
    /// The option set the command line uses when none is given: language
    /// extensions plus the default optimizations.
    pub fn defaults() -> Self {
        Self {
            extendedglobalexpr: true,
            extendedtypecast: true,
            extendedassignment: true,
            allowkeyconcat: true,
            allowmultistrings: true,
            processpre: true,
            optimize: true,
            constfold: true,
            dcr: true,
            optlistadd: true,
            ..Self::default()
        }
    }

    /// Set a single option by its lowercase name. Unknown names are
    /// ignored, matching the behavior of `#pragma OPT` in the original
    /// toolchain.
    pub fn set_by_name(&mut self, name: &str, value: bool) {
        match name {
            "extendedglobalexpr" => self.extendedglobalexpr = value,
            "extendedtypecast" => self.extendedtypecast = value,
            "extendedassignment" => self.extendedassignment = value,
            "explicitcast" => self.explicitcast = value,
            "allowkeyconcat" => self.allowkeyconcat = value,
            "allowmultistrings" => self.allowmultistrings = value,
            "processpre" => self.processpre = value,
            "enableswitch" => self.enableswitch = value,
            "breakcont" => self.breakcont = value,
            "errmissingdefault" => self.errmissingdefault = value,
            "lazylists" => self.lazylists = value,
            "duplabels" => self.duplabels = value,
            "shrinknames" => self.shrinknames = value,
            "funcoverride" => self.funcoverride = value,
            "inline" => self.inline = value,
            "optimize" => self.optimize = value,
            "emap" => self.emap = value,
            "prettify" => self.prettify = value,
            "constfold" => self.constfold = value,
            "dcr" => self.dcr = value,
            "optlistadd" => self.optlistadd = value,
            "listlength" => self.listlength = value,
            _ => {}
        }
    }

    /// Apply a comma-separated option spec like `+lazylists,-dcr,emap`.
    /// A bare name counts as `+name`.
    pub fn apply_spec(&mut self, spec: &str) {
        for opt in spec.split(',') {
            let opt = opt.trim();
            if opt.is_empty() {
                continue;
            }
            if let Some(name) = opt.strip_prefix('-') {
                self.set_by_name(&name.to_ascii_lowercase(), false);
            } else if let Some(name) = opt.strip_prefix('+') {
                self.set_by_name(&name.to_ascii_lowercase(), true);
            } else {
                self.set_by_name(&opt.to_ascii_lowercase(), true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_all_off() {
        let opts = Options::default();
        assert!(!opts.optimize);
        assert!(!opts.lazylists);
    }

    #[test]
    fn set_by_name_toggles() {
        let mut opts = Options::default();
        opts.set_by_name("lazylists", true);
        assert!(opts.lazylists);
        opts.set_by_name("lazylists", false);
        assert!(!opts.lazylists);
    }

    #[test]
    fn unknown_names_are_ignored() {
        let mut opts = Options::default();
        opts.set_by_name("nosuchoption", true);
        assert_eq!(opts, Options::default());
    }

    #[test]
    fn apply_spec_mixed_signs() {
        let mut opts = Options::defaults();
        opts.apply_spec("+lazylists,-dcr,enableswitch");
        assert!(opts.lazylists);
        assert!(!opts.dcr);
        assert!(opts.enableswitch);
        assert!(opts.optimize);
    }
}
