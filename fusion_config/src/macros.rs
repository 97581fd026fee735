/// Macro to create a configuration value group struct.
///
/// Usage:
/// ```rust
/// mod transfer {
///     fusion_config::config_group!({
///         ref part_count_hint: usize = 42;
///         ref label: String = "default".to_string();
///     });
/// }
/// let mut values = transfer::ConfigValueGroup::new();
/// values.apply_env_overrides();
/// ```
///
/// This creates a `ConfigValueGroup` struct with the specified fields. `apply_env_overrides` reads
/// `FUSION_<GROUP>_<FIELD>` where the group name is the last segment of the invoking module's path.
#[macro_export]
macro_rules! config_group {
    ({
        $(
            $(#[$meta:meta])*
            ref $name:ident : $type:ty = $value:expr;
        )+
    }) => {
        #[allow(unused_imports)]
        use $crate::ParsableConfigValue;

        /// ConfigValueGroup struct containing all configurable values
        #[derive(Debug, Clone)]
        pub struct ConfigValueGroup {
            $(
                $(#[$meta])*
                #[allow(non_snake_case)]
                pub $name: $type,
            )+
        }

        impl Default for ConfigValueGroup {
            /// Create a new instance with default values only (no environment variable overrides).
            fn default() -> Self {
                Self {
                    $(
                        $name: {
                            let v: $type = $value;
                            v
                        },
                    )+
                }
            }
        }

        impl ConfigValueGroup {
            /// Create a new instance with default values only (no environment variable overrides).
            pub fn new() -> Self {
                Self::default()
            }

            /// The group name, derived from the last segment of the module path.
            pub fn group_name() -> &'static str {
                module_path!().rsplit("::").next().unwrap_or("unknown")
            }

            /// The environment variable consulted for a given field of this group.
            pub fn env_var_name(field: &str) -> String {
                format!("{}_{}_{}", $crate::ENV_PREFIX, Self::group_name().to_uppercase(), field.to_uppercase())
            }

            /// Apply environment variable overrides to this configuration group.
            pub fn apply_env_overrides(&mut self) {
                $(
                    let env_var_name = Self::env_var_name(stringify!($name));
                    let maybe_env_value = std::env::var(&env_var_name).ok();
                    let default_value: $type = $value;
                    self.$name = <$type>::parse(&env_var_name, maybe_env_value, default_value);
                )+
            }
        }

        /// Type alias for easier reference in config aggregation
        pub type ConfigValues = ConfigValueGroup;
    };
}
