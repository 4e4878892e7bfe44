pub mod built_info {
    use lazy_static::lazy_static;
    include!(concat!(env!("OUT_DIR"), "/built.rs"));

    /// `PKG_VERSION`, then `-<short git hash>` when built from a checkout and `-dirty` when that
    /// checkout had uncommitted changes.
    fn version_string() -> String {
        let mut version = PKG_VERSION.to_string();
        if let Some(hash) = GIT_COMMIT_HASH_SHORT {
            version.push('-');
            version.push_str(hash);
        }
        if GIT_DIRTY == Some(true) {
            version.push_str("-dirty");
        }
        version
    }

    lazy_static! {
        pub static ref VERSION: String = version_string();
    }

    /// A one-line description of the build for startup logging.
    pub fn banner() -> String {
        format!("{} {} ({}, {})", PKG_NAME, *VERSION, TARGET, PROFILE)
    }
}
