use cfn_resource_core::identity::{DEFAULT_PHYSICAL_ID_MAX_LENGTH, MIN_PHYSICAL_ID_MAX_LENGTH};
use cfn_resource_core::validation::ResourceTypeSpec;

pub const ENV_RAISE_ON_FAILURE: &str = "CFN_RESOURCE_RAISE_ON_FAILURE";
pub const ENV_RAISE_ON_DELIVERY_FAILURE: &str = "CFN_RESOURCE_RAISE_ON_DELIVERY_FAILURE";
pub const ENV_STRINGIFY_OUTPUT: &str = "CFN_RESOURCE_STRINGIFY_OUTPUT";
pub const ENV_GENERATE_PHYSICAL_ID: &str = "CFN_RESOURCE_GENERATE_PHYSICAL_ID";

/// Per-resource behavior switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceConfig {
    pub resource_type: ResourceTypeSpec,
    /// Pre-assign a unique physical id before Create runs.
    pub generate_physical_id: bool,
    /// Serialize structured attribute values to compact JSON strings.
    pub stringify_output: bool,
    /// Surface the underlying failure after the FAILED response is sent.
    pub raise_on_failure: bool,
    /// Surface delivery failures instead of only logging them.
    pub raise_on_delivery_failure: bool,
    /// Answer Delete for a failed Create's placeholder id without calling
    /// the delete operation.
    pub skip_delete_of_failed_create: bool,
    pub physical_id_max_length: usize,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            resource_type: ResourceTypeSpec::Unchecked,
            generate_physical_id: true,
            stringify_output: true,
            raise_on_failure: false,
            raise_on_delivery_failure: false,
            skip_delete_of_failed_create: true,
            physical_id_max_length: DEFAULT_PHYSICAL_ID_MAX_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a boolean (true/false/1/0/yes/no), got {value:?}")]
    InvalidBoolean { name: &'static str, value: String },
    #[error("physical id max length {length} is below the minimum of {minimum}")]
    PhysicalIdMaxLengthTooShort { length: usize, minimum: usize },
}

impl ResourceConfig {
    pub fn new(resource_type: ResourceTypeSpec) -> Self {
        Self {
            resource_type,
            ..Self::default()
        }
    }

    pub fn with_generate_physical_id(mut self, enabled: bool) -> Self {
        self.generate_physical_id = enabled;
        self
    }

    pub fn with_stringify_output(mut self, enabled: bool) -> Self {
        self.stringify_output = enabled;
        self
    }

    pub fn with_raise_on_failure(mut self, enabled: bool) -> Self {
        self.raise_on_failure = enabled;
        self
    }

    pub fn with_raise_on_delivery_failure(mut self, enabled: bool) -> Self {
        self.raise_on_delivery_failure = enabled;
        self
    }

    pub fn with_skip_delete_of_failed_create(mut self, enabled: bool) -> Self {
        self.skip_delete_of_failed_create = enabled;
        self
    }

    pub fn with_physical_id_max_length(mut self, max_length: usize) -> Self {
        self.physical_id_max_length = max_length;
        self
    }

    /// Rejects limits too short to hold a failed-create placeholder.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.physical_id_max_length < MIN_PHYSICAL_ID_MAX_LENGTH {
            return Err(ConfigError::PhysicalIdMaxLengthTooShort {
                length: self.physical_id_max_length,
                minimum: MIN_PHYSICAL_ID_MAX_LENGTH,
            });
        }
        Ok(())
    }

    /// Applies `CFN_RESOURCE_*` overrides read through `lookup`.
    pub fn apply_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = read_flag(&lookup, ENV_RAISE_ON_FAILURE)? {
            self.raise_on_failure = value;
        }
        if let Some(value) = read_flag(&lookup, ENV_RAISE_ON_DELIVERY_FAILURE)? {
            self.raise_on_delivery_failure = value;
        }
        if let Some(value) = read_flag(&lookup, ENV_STRINGIFY_OUTPUT)? {
            self.stringify_output = value;
        }
        if let Some(value) = read_flag(&lookup, ENV_GENERATE_PHYSICAL_ID)? {
            self.generate_physical_id = value;
        }
        Ok(self)
    }

    pub fn with_process_env(self) -> Result<Self, ConfigError> {
        self.apply_env_overrides(|name| std::env::var(name).ok())
    }
}

fn read_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<bool>, ConfigError> {
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    match parse_flag(&value) {
        Some(flag) => Ok(Some(flag)),
        None => Err(ConfigError::InvalidBoolean { name, value }),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
