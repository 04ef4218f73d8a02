// This file is the module declaration file for the `builders` module.
// It declares and makes public all the sub-modules within the `src/builders`
// directory. These modules build selectors, regexes and reports from the
// configured rules and apply them to the host.

// `compat` module:
// Optional adjustments for companion plugins. Currently only Quick Explorer,
// whose popup menus render folders with their own classes and attributes.
pub mod compat;

// `ignore_list` module:
// Mirrors the configured rules into the host's ignore list and removes the
// entries again when folders are shown or rules are deleted.
pub mod ignore_list;

// `importer` module:
// Reads rule lists from text, JSON, YAML or TOML files.
pub mod importer;

// `observer` module:
// Turns host notifications into re-scan triggers, including the settle
// delay after a rename.
pub mod observer;

// `patterns` module:
// This is a fundamental module that defines how a rule string is parsed
// (`FolderRule`, `RuleKind`) and provides the `PatternMatcher` trait, which
// renders a rule as an attribute selector and as an ignore-list regex.
pub mod patterns;

// `processor` module:
// Applies the rules to the rendered tree: marks matched folders and hides
// or shows them.
pub mod processor;

// `reporter` module:
// Human-readable and JSON status reports for the `status` command.
pub mod reporter;

// `selector` module:
// A small parser and matcher for the CSS selector subset the rules compile
// to (class, tag and attribute selectors, comma-separated).
pub mod selector;

// `validator` module:
// Checks the configured rules for likely mistakes such as empty lines,
// duplicates and misspelled prefixes.
pub mod validator;
