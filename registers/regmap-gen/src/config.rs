// Licensed under the Apache-2.0 license

//! Configuration for layout and rendering policy.
//!
//! Two generations of the register-map tool disagree on when a field may
//! refine a register's per-byte access width and on how read-only fields are
//! rendered. [`LayoutPolicy`] selects one of them explicitly; [`GeneratorConfig`]
//! bundles the policy with the remaining rendering switches.

/// Which atom-refinement and rendering rules to apply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutPolicy {
    /// A self-aligned field only refines the atom list when its width equals
    /// the register's base atom. Read-only fields render like any other field
    /// and top-level registers are emitted as plain unions.
    #[default]
    BaseAtom,

    /// A self-aligned field also refines the atom list when it carries the
    /// Array flag. Read-only fields render `const`, registers outside a named
    /// module render as `extern volatile union` declarations and unknown
    /// option directives are reported.
    ArrayFlag,
}

impl LayoutPolicy {
    pub fn const_read_only_fields(self) -> bool {
        self == LayoutPolicy::ArrayFlag
    }

    pub fn volatile_top_level(self) -> bool {
        self == LayoutPolicy::ArrayFlag
    }

    pub fn reports_unknown_options(self) -> bool {
        self == LayoutPolicy::ArrayFlag
    }
}

/// Configuration for a generator run.
///
/// # Example
///
/// ```
/// use regmap_gen::config::{GeneratorConfig, LayoutPolicy};
///
/// let config = GeneratorConfig::new()
///     .policy(LayoutPolicy::ArrayFlag)
///     .pad_to_width(true);
/// assert_eq!(config.layout_policy, LayoutPolicy::ArrayFlag);
/// assert!(config.trailing_padding);
/// ```
#[derive(Clone, Debug, Default)]
pub struct GeneratorConfig {
    /// Atom refinement and rendering rules.
    pub layout_policy: LayoutPolicy,

    /// Close every layer that ends below the register width with an anonymous
    /// padding field covering the remaining bits.
    pub trailing_padding: bool,
}

impl GeneratorConfig {
    /// The original tool's behavior: [`LayoutPolicy::BaseAtom`], no trailing padding.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(mut self, policy: LayoutPolicy) -> Self {
        self.layout_policy = policy;
        self
    }

    pub fn pad_to_width(mut self, pad: bool) -> Self {
        self.trailing_padding = pad;
        self
    }
}
