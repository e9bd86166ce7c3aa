//! Declarative macro generating port error enums with snake_case constructors.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Constructor generation for port error enums.
    define_port_error! {
        pub enum SamplePortError {
            Missing { resource: String } => "{resource} not found",
            Retries { attempts: u8 } => "gave up after {attempts} attempts",
            Rejected { field: String, attempts: u8 } => "{field} rejected after {attempts} attempts",
        }
    }

    #[test]
    fn string_fields_accept_borrowed_text() {
        let err = SamplePortError::missing("meal plan");
        assert_eq!(err.to_string(), "meal plan not found");
    }

    #[test]
    fn non_string_fields_keep_their_type() {
        let err = SamplePortError::retries(3_u8);
        assert_eq!(err, SamplePortError::Retries { attempts: 3 });
    }

    #[test]
    fn mixed_fields_render_in_order() {
        let err = SamplePortError::rejected("username", 2_u8);
        assert_eq!(err.to_string(), "username rejected after 2 attempts");
    }
}
