/// Implements [`ActionData`](crate::ActionData) for one or more types.
///
/// Plain types become roots of their own hierarchy. The `Type => field` form
/// declares that `Type` refines the action stored in `field`, so handlers
/// and typed middleware declared for the field's type also accept `Type`.
///
/// ```
/// use fluxgate_core::action_data;
///
/// #[derive(Debug)]
/// struct UserAction { user_id: u32 }
///
/// #[derive(Debug)]
/// struct RenameUser { base: UserAction, name: String }
///
/// action_data!(UserAction);
/// action_data!(RenameUser => base);
/// ```
#[macro_export]
macro_rules! action_data {
    ($ty:ty => $parent:ident) => {
        impl $crate::ActionData for $ty {
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn parent(&self) -> ::std::option::Option<&dyn $crate::ActionData> {
                ::std::option::Option::Some(&self.$parent)
            }
        }
    };
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::ActionData for $ty {
                fn as_any(&self) -> &dyn ::std::any::Any {
                    self
                }
            }
        )+
    };
}

/// Reads a setting from the environment, falling back to the default of the
/// same name in [`crate::config`].
macro_rules! get_fluxgate_setting {
    ($setting:ident) => {
        ::std::env::var(stringify!($setting)).unwrap_or(crate::config::$setting.to_string())
    };
    ($setting:ident, bool) => {
        match ::std::env::var(stringify!($setting)) {
            Ok(v) => match v.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    log::warn!(
                        "Env var setting {}, is not a valid boolean. Using default",
                        stringify!($setting)
                    );
                    crate::config::$setting
                }
            },
            Err(_e) => crate::config::$setting,
        }
    };
}
pub(crate) use get_fluxgate_setting;
