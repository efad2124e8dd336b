pub(crate) mod check;
pub(crate) mod lifecycle;
pub(crate) mod transition;
