//! Remote storage integration.
//!
//! The transfer engine never talks to Google Drive directly; it goes through
//! the [`store::RemoteStore`] trait, which covers exactly the four calls the
//! engine needs: folder lookup, folder creation, file lookup, and file
//! upload. [`drive::DriveClient`] implements that trait over the Drive v3
//! REST API and additionally exposes the wider collaborator surface
//! (downloads with byte ranges, Workspace document export, trash/restore,
//! and permanent deletion).

/// Remote node model and the storage trait the engine is written against
pub mod store;

/// Google Drive REST implementation
pub mod drive;
