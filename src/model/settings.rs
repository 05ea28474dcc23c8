use serde_json::Value;
use std::fmt;

/// Dot-joined path to a field in a settings tree, e.g. `debug.frontend`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath(String);

impl KeyPath {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn child(&self, key: &str) -> Self {
        if self.0.is_empty() {
            Self(key.to_string())
        } else {
            Self(format!("{}.{key}", self.0))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|segment| !segment.is_empty())
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Leaf value of a settings tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Number,
    Text,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScalarKind::Bool => "boolean",
            ScalarKind::Number => "number",
            ScalarKind::Text => "string",
        })
    }
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::Number(_) => ScalarKind::Number,
            Scalar::Text(_) => ScalarKind::Text,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => Value::Number(n.clone()),
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }

    /// Read a JSON value as a scalar of `kind`. Anything else is `None`.
    pub fn from_json(value: &Value, kind: ScalarKind) -> Option<Self> {
        match (kind, value) {
            (ScalarKind::Bool, Value::Bool(b)) => Some(Scalar::Bool(*b)),
            (ScalarKind::Number, Value::Number(n)) => Some(Scalar::Number(n.clone())),
            (ScalarKind::Text, Value::String(s)) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value.into())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    Leaf(Scalar),
    Group(SettingsGroup),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SettingsError {
    #[error("unknown settings key: {0}")]
    UnknownKey(KeyPath),
    #[error("settings key {0} is a group, not a value")]
    NotALeaf(KeyPath),
    #[error("settings key {path} holds a {expected}, got a {found}")]
    KindMismatch {
        path: KeyPath,
        expected: ScalarKind,
        found: ScalarKind,
    },
}

/// Insertion-ordered settings mapping. Keys are fixed once built: values can be
/// reassigned but never added or removed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettingsGroup {
    entries: Vec<(String, Setting)>,
}

impl SettingsGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a leaf.
    pub fn leaf(self, key: &str, value: impl Into<Scalar>) -> Self {
        self.with_entry(key, Setting::Leaf(value.into()))
    }

    /// Builder: append a nested group.
    pub fn group(self, key: &str, group: SettingsGroup) -> Self {
        self.with_entry(key, Setting::Group(group))
    }

    // A key must be one non-empty path segment, unique among its siblings.
    fn with_entry(mut self, key: &str, setting: Setting) -> Self {
        assert!(
            !key.is_empty() && !key.contains('.'),
            "settings key {key:?} must be a single path segment"
        );
        assert!(
            self.entry(key).is_none(),
            "settings key {key:?} declared twice"
        );
        self.entries.push((key.to_string(), setting));
        self
    }

    /// The plugin's declared settings schema with default values.
    pub fn defaults() -> Self {
        SettingsGroup::new()
            .group(
                "debug",
                SettingsGroup::new()
                    .leaf("frontend", true)
                    .leaf("backend", true),
            )
            .leaf("profile", "")
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Setting)> {
        self.entries.iter().map(|(key, setting)| (key.as_str(), setting))
    }

    /// Flatten to `(path, value)` pairs, depth first in insertion order.
    pub fn leaves(&self) -> Vec<(KeyPath, Scalar)> {
        let mut out = Vec::new();
        self.collect_leaves(&KeyPath::root(), &mut out);
        out
    }

    fn collect_leaves(&self, prefix: &KeyPath, out: &mut Vec<(KeyPath, Scalar)>) {
        for (key, setting) in &self.entries {
            let path = prefix.child(key);
            match setting {
                Setting::Group(group) => group.collect_leaves(&path, out),
                Setting::Leaf(value) => out.push((path, value.clone())),
            }
        }
    }

    pub fn get(&self, path: &KeyPath) -> Option<&Scalar> {
        match self.lookup(path)? {
            Setting::Leaf(value) => Some(value),
            Setting::Group(_) => None,
        }
    }

    fn lookup(&self, path: &KeyPath) -> Option<&Setting> {
        let mut segments = path.segments();
        let first = segments.next()?;
        let mut current = self.entry(first)?;
        for segment in segments {
            match current {
                Setting::Group(group) => current = group.entry(segment)?,
                Setting::Leaf(_) => return None,
            }
        }
        Some(current)
    }

    fn entry(&self, key: &str) -> Option<&Setting> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    fn entry_mut(&mut self, key: &str) -> Option<&mut Setting> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    /// Replace the leaf at `path`. The path must exist and the new value must
    /// have the same kind as the current one.
    pub fn assign(&mut self, path: &KeyPath, value: Scalar) -> Result<(), SettingsError> {
        let unknown = || SettingsError::UnknownKey(path.clone());
        let mut segments = path.segments().peekable();
        let mut group = self;

        while let Some(segment) = segments.next() {
            let setting = group.entry_mut(segment).ok_or_else(unknown)?;
            let is_last = segments.peek().is_none();
            match (setting, is_last) {
                (Setting::Group(inner), false) => group = inner,
                (Setting::Group(_), true) => return Err(SettingsError::NotALeaf(path.clone())),
                (Setting::Leaf(_), false) => return Err(unknown()),
                (Setting::Leaf(current), true) => {
                    if current.kind() != value.kind() {
                        return Err(SettingsError::KindMismatch {
                            path: path.clone(),
                            expected: current.kind(),
                            found: value.kind(),
                        });
                    }
                    *current = value;
                    return Ok(());
                }
            }
        }

        Err(unknown())
    }

    /// Same keys, same nesting and same leaf kinds. Leaf values may differ.
    pub fn same_shape(&self, other: &SettingsGroup) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().zip(&other.entries).all(|((ka, a), (kb, b))| {
                ka == kb
                    && match (a, b) {
                        (Setting::Group(ga), Setting::Group(gb)) => ga.same_shape(gb),
                        (Setting::Leaf(la), Setting::Leaf(lb)) => la.kind() == lb.kind(),
                        _ => false,
                    }
            })
    }
}

pub const DEBUG_FRONTEND: &str = "debug.frontend";
pub const DEBUG_BACKEND: &str = "debug.backend";
pub const PROFILE: &str = "profile";

/// Default tree plus the live mirror of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    defaults: SettingsGroup,
    live: SettingsGroup,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(SettingsGroup::defaults())
    }
}

impl Settings {
    pub fn new(defaults: SettingsGroup) -> Self {
        Self {
            live: defaults.clone(),
            defaults,
        }
    }

    pub fn defaults(&self) -> &SettingsGroup {
        &self.defaults
    }

    pub fn live(&self) -> &SettingsGroup {
        &self.live
    }

    pub fn assign(&mut self, path: &KeyPath, value: Scalar) -> Result<(), SettingsError> {
        self.live.assign(path, value)
    }

    pub fn get(&self, path: &KeyPath) -> Option<&Scalar> {
        self.live.get(path)
    }

    pub fn debug_frontend(&self) -> bool {
        self.bool_at(DEBUG_FRONTEND)
    }

    pub fn debug_backend(&self) -> bool {
        self.bool_at(DEBUG_BACKEND)
    }

    pub fn profile(&self) -> &str {
        match self.get(&KeyPath::new(PROFILE)) {
            Some(Scalar::Text(name)) => name,
            _ => "",
        }
    }

    pub fn set_debug_frontend(&mut self, enabled: bool) -> Result<(), SettingsError> {
        self.assign(&KeyPath::new(DEBUG_FRONTEND), enabled.into())
    }

    pub fn set_debug_backend(&mut self, enabled: bool) -> Result<(), SettingsError> {
        self.assign(&KeyPath::new(DEBUG_BACKEND), enabled.into())
    }

    pub fn set_profile(&mut self, name: impl Into<String>) -> Result<(), SettingsError> {
        self.assign(&KeyPath::new(PROFILE), Scalar::Text(name.into()))
    }

    fn bool_at(&self, path: &str) -> bool {
        matches!(self.get(&KeyPath::new(path)), Some(Scalar::Bool(true)))
    }
}
