pub mod define;

macro_rules! impl_error {
    ($category:ident ,$name : ident, $message:expr, $descr : expr) => {
        #[doc = $descr]
        #[derive(Debug)]
        pub struct $name(&'static str /* message(description) */,String /* sub message*/, Option<Box<dyn Error>> /* cause */);

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "[{}] cause {} : {}", stringify!($category), self.0, self.1)?;

                let mut ptr = self.source();
                let mut i = 0;
                while let Some(d) = ptr {
                    write!(f, "\n    {} at {}", i, d)?;
                    ptr = d.source();
                    i += 1;
                }

                Ok(())
            }
        }

        impl Error for $name  {
            fn source(&self) -> Option<&(dyn Error + 'static)> {
                self.2.as_deref()
            }
        }

        impl $name {
            pub fn new(sub_msg : String) -> Box<dyn Error> {
                Box::new($name($message, sub_msg, None))
            }

            pub fn chain(sub_msg : String, right : Box<dyn Error>) -> Box<dyn Error> {
                Box::new($name($message, sub_msg, Some(right)))
            }

            pub fn message(&self) -> &'static str {
                self.0
            }
        }

    };
}

macro_rules! impl_err_mod {
    ($name:ident, [$((
        $err_name:ident, $message:expr, $descr:expr)),*
    ]) => {
        pub mod $name {
            use std::error::Error;
            use std::fmt::Display;

            use crate::err::impl_error;

            $(impl_error!($name, $err_name, $message, $descr);)*
        }
    }
}

pub(crate) use impl_error;
pub(crate) use impl_err_mod;

#[macro_export]
macro_rules! func {
    () => {
        {
            fn f() {}
            fn type_name_of<T>(_: T) -> &'static str {
                std::any::type_name::<T>()
            }
            let name = type_name_of(f);
            &name[..name.len() - 3]
        }
    };
}
pub use func;

#[macro_export]
macro_rules! make_err_msg {
    ($($arg:tt)+) => {{
        format!("{} [{}:{}] : {}", $crate::err::func!(), file!(), line!(), format!($($arg)+))
    }};
}
pub use make_err_msg;
