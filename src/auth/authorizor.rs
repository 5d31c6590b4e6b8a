use oso::{Oso, PolarClass};

use crate::auth::User;
use crate::entities::{Load, Session};
use crate::error::Error;

pub fn new() -> Result<Oso, Error> {
    let mut o = Oso::new();

    o.register_class(User::get_polar_class())?;
    o.register_class(Load::get_polar_class())?;
    o.register_class(Session::get_polar_class())?;

    o.load_str(include_str!("rules.polar"))?;

    Ok(o)
}
