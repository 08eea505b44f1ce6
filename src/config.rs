use std::env;
use std::fmt::Debug;
use std::str::FromStr;

/// Returns the value of the named environment variable if it exists or panics.
pub fn get_variable(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("must define {} environment variable", name))
}

/// Returns the named environment variable parsed as `T`, or panics.
pub fn parse_variable<T>(name: &str) -> T
where
    T: FromStr,
    T::Err: Debug,
{
    get_variable(name)
        .parse()
        .unwrap_or_else(|e| panic!("parse {} environment variable: {:?}", name, e))
}
