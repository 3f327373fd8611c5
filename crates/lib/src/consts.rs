/// Environment variable overriding the build root.
pub const ROOT_ENV_VAR: &str = "DEBSTAGE_ROOT";

/// Hidden administrative directory under the build root.
pub const ADMIN_DIR: &str = ".debstage";

/// Suffix appended to a package name to form its default instruction file name.
pub const INSTRUCTIONS_SUFFIX: &str = ".instructions.xml";

/// Suffix appended to a package name to form its post-install make target.
pub const POSTINSTALL_TARGET_SUFFIX: &str = "-postinstall";

/// Subtrees removed by [`crate::prune::prune_docs`].
pub const DEFAULT_PRUNE_TARGETS: &[&str] = &["/usr/share/doc", "/usr/share/man"];

/// Default archive extraction command. `{archive}` and `{dest}` are substituted per argument.
pub const DEFAULT_EXTRACT_COMMAND: &[&str] = &["dpkg-deb", "-X", "{archive}", "{dest}"];

/// Program run for the post-install target.
pub const DEFAULT_MAKE_PROGRAM: &str = "make";
