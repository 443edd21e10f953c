//! Modulefile contents and their Tcl rendering.

use std::fmt::Write as _;
use std::path::PathBuf;

/// First line of every modulefile.
pub const MODULE_HEADER: &str = "#%Module1.0";

/// One `prepend-path <var> <path>` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrepend {
    pub var: String,
    pub path: PathBuf,
}

impl PathPrepend {
    pub fn new(var: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            var: var.into(),
            path: path.into(),
        }
    }

    fn group(&self) -> u8 {
        match self.var.as_str() {
            "PATH" => 0,
            "LD_LIBRARY_PATH" => 1,
            _ => 2,
        }
    }
}

/// Contents of one modulefile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: String,
    pub version: String,
    pub help: String,
    pub whatis: String,
    /// Extra modules that may not be loaded alongside this one.
    /// The module itself is always the first conflict.
    pub conflicts: Vec<String>,
    pub path_prepends: Vec<PathPrepend>,
    pub env_sets: Vec<(String, String)>,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        let version = version.into();
        let text = format!("{} {}", name, version);
        Self {
            help: text.clone(),
            whatis: text,
            name,
            version,
            conflicts: Vec::new(),
            path_prepends: Vec::new(),
            env_sets: Vec::new(),
        }
    }

    /// `name/version`, as given to `module load`.
    pub fn module_id(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }

    /// Conflict set with the module itself first and no duplicates.
    pub fn conflict_set(&self) -> Vec<&str> {
        let mut set = vec![self.name.as_str()];
        for conflict in &self.conflicts {
            if !set.contains(&conflict.as_str()) {
                set.push(conflict);
            }
        }
        set
    }

    /// Path prepends grouped PATH, then LD_LIBRARY_PATH, then the rest,
    /// keeping declaration order inside each group.
    pub fn ordered_prepends(&self) -> Vec<&PathPrepend> {
        let mut prepends: Vec<&PathPrepend> = self.path_prepends.iter().collect();
        prepends.sort_by_key(|p| p.group());
        prepends
    }

    /// Render the complete modulefile.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{}", MODULE_HEADER);
        let _ = writeln!(out, "proc ModulesHelp {{ }} {{");
        let _ = writeln!(out, "    puts stderr {}", quote(&self.help));
        let _ = writeln!(out, "}}");
        let _ = writeln!(out, "module-whatis {}", quote(&self.whatis));
        for conflict in self.conflict_set() {
            let _ = writeln!(out, "conflict {}", tcl_word(conflict));
        }
        for prepend in self.ordered_prepends() {
            let _ = writeln!(
                out,
                "prepend-path {} {}",
                tcl_word(&prepend.var),
                tcl_word(&prepend.path.to_string_lossy())
            );
        }
        for (var, value) in &self.env_sets {
            let _ = writeln!(out, "setenv {} {}", tcl_word(var), tcl_word(value));
        }
        out
    }
}

/// Double-quote `s` for Tcl, escaping characters Tcl would substitute.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' | '$' | '[' | ']' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Emit `s` bare when it is a plain Tcl word, quoted otherwise.
fn tcl_word(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:=@,%~".contains(c));
    if plain { s.to_string() } else { quote(s) }
}
