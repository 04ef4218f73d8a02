// This file is the module declaration file for the `core` module.
// It declares the submodules contained within `src/core/` and exposes them
// to the rest of the crate.

// `config` module:
// Owns the plugin's persisted settings record (`Settings`), the
// `ConfigProvider` trait used to load and save it, and the `ConfigManager`
// that finds a vault and reads/writes `data.json` inside it.
pub mod config;

// `engine` module:
// The plugin instance itself (`HideFoldersPlugin`). It wires the settings,
// the change observer, the folder processor and the ignore-list
// synchronizer together and exposes every user-facing action.
pub mod engine;

// `events` module:
// Host notifications (tree mutations and renames) delivered over channels,
// plus the `EventBus` that hands out subscriptions.
pub mod events;

// `tree` module:
// The `FolderTree` abstraction over the host's rendered UI and `DomTree`,
// an in-memory document that records mutations the way a browser does.
pub mod tree;

// `vault` module:
// Access to the host's vault-wide configuration (`app.json`), where the
// user's ignore list lives.
pub mod vault;
