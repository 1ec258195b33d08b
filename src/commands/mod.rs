use crate::context::Context;
use crate::utils::exit_codes::ExitCode;
use gfs::FsError;
use log::error;
use std::collections::HashMap;

/// Wrong number or shape of command arguments.
#[derive(Debug, thiserror::Error)]
#[error("usage: gfs {0}")]
pub struct Usage(pub &'static str);

type Handler = fn(&[&str], &mut Context) -> anyhow::Result<()>;

pub struct Registry {
    pub map: HashMap<&'static str, Handler>,
}

impl Registry {
    pub fn new() -> Self {
        let mut map = HashMap::new();
        map.insert("create", create::handle_argv as Handler);
        map.insert("add", add::handle_argv as Handler);
        map.insert("get", get::handle_argv as Handler);
        map.insert("remove", remove::handle_argv as Handler);
        map.insert("tree", tree::handle_argv as Handler);
        map.insert("status", status::handle_argv as Handler);
        map.insert("drop", drop::handle_argv as Handler);
        map.insert("version", version::handle_argv as Handler);
        map.insert("help", help::handle_argv as Handler);

        Self { map }
    }

    pub fn dispatch(&self, name: &str, argv: &[&str], context: &mut Context) -> ExitCode {
        let Some(handler) = self.map.get(name) else {
            error!("unknown command: {name}");
            return ExitCode::Usage;
        };

        match handler(argv, context) {
            Ok(()) => ExitCode::Success,
            Err(err) => {
                error!("{err:#}");
                exit_code_for(&err)
            }
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    if let Some(fs_err) = err.downcast_ref::<FsError>() {
        ExitCode::from(fs_err)
    } else if err.downcast_ref::<Usage>().is_some() {
        ExitCode::Usage
    } else {
        ExitCode::Io
    }
}

pub mod add;
pub mod create;
pub mod drop;
pub mod get;
pub mod help;
pub mod remove;
pub mod status;
pub mod tree;
pub mod version;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;

    #[test]
    fn exit_codes_follow_core_errors() {
        let err = anyhow::Error::new(FsError::NotFound("a".into())).context("get a");
        assert_eq!(exit_code_for(&err), ExitCode::NotFound);

        let err: anyhow::Error = Err::<(), _>(FsError::OutOfSpace { required: 2, free: 1 })
            .context("add")
            .unwrap_err();
        assert_eq!(exit_code_for(&err), ExitCode::OutOfSpace);

        assert_eq!(exit_code_for(&Usage("tree <drive>").into()), ExitCode::Usage);
        assert_eq!(
            exit_code_for(&std::io::Error::other("boom").into()),
            ExitCode::Io
        );
    }

    #[test]
    fn unknown_command_is_a_usage_error() {
        let registry = Registry::new();
        let mut context = Context::new();
        assert_eq!(registry.dispatch("format", &[], &mut context), ExitCode::Usage);
    }
}
