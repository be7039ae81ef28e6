use std::future::Future;
use std::io;

/// The host pipeline is responsible for kerberos logins (keytabs, ticket renewal, etc); this
/// trait is the seam it plugs into.
pub trait KerberosLogin {
  /// Ensures a valid ticket exists for `principal`.
  fn login(&self, principal: &str) -> io::Result<()>;
}

/// Relies on whatever tickets are already present in the ambient credential cache (e.g obtained
/// with `kinit`). The driver's GSSAPI support reads that cache directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct TicketCache;

impl KerberosLogin for TicketCache {
  fn login(&self, principal: &str) -> io::Result<()> {
    log::debug!("using ambient ticket cache for principal '{principal}'");
    Ok(())
  }
}

/// The context that metadata lookups run in. When kerberos is in use the principal has been
/// logged in before the context is handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
  principal: Option<String>,
}

impl AuthContext {
  /// Logs in (when kerberos is enabled) and returns the context.
  pub fn create(use_kerberos: bool, principal: Option<&str>, login: &dyn KerberosLogin) -> io::Result<Self> {
    if !use_kerberos {
      return Ok(Self { principal: None });
    }

    let principal = principal.filter(|inner| !inner.is_empty()).ok_or_else(|| {
      log::warn!("kerberos authentication requested without a principal");
      io::Error::new(io::ErrorKind::InvalidInput, "kerberos authentication requires a username")
    })?;

    login.login(principal).map_err(|error| {
      log::warn!("unable to log in '{principal}' - {error}");
      io::Error::new(error.kind(), format!("error logging in as '{principal}' - {error}"))
    })?;

    Ok(Self {
      principal: Some(principal.to_string()),
    })
  }

  /// The kerberos principal of this context, if any.
  pub fn principal(&self) -> Option<&str> {
    self.principal.as_deref()
  }

  /// Runs `action` within this context; failures are annotated with `description`.
  pub async fn run<F, T>(&self, description: &str, action: F) -> io::Result<T>
  where
    F: Future<Output = io::Result<T>>,
  {
    match &self.principal {
      Some(principal) => log::debug!("running '{description}' as '{principal}'"),
      None => log::trace!("running '{description}'"),
    }

    action.await.map_err(|error| {
      log::warn!("unable to {description} - {error}");
      io::Error::new(error.kind(), format!("unable to {description} - {error}"))
    })
  }
}

#[cfg(test)]
mod tests {
  use super::{AuthContext, KerberosLogin, TicketCache};
  use std::cell::RefCell;
  use std::io;

  #[derive(Default)]
  struct RecordingLogin {
    principals: RefCell<Vec<String>>,
  }

  impl KerberosLogin for RecordingLogin {
    fn login(&self, principal: &str) -> io::Result<()> {
      self.principals.borrow_mut().push(principal.to_string());
      Ok(())
    }
  }

  struct FailingLogin;

  impl KerberosLogin for FailingLogin {
    fn login(&self, _principal: &str) -> io::Result<()> {
      Err(io::Error::new(io::ErrorKind::PermissionDenied, "no keytab"))
    }
  }

  #[test]
  fn test_without_kerberos_skips_login() {
    let login = RecordingLogin::default();
    let context = AuthContext::create(false, Some("etl"), &login).expect("failed context");
    assert_eq!(context.principal(), None);
    assert!(login.principals.borrow().is_empty());
  }

  #[test]
  fn test_kerberos_logs_in() {
    let login = RecordingLogin::default();
    let context = AuthContext::create(true, Some("etl@REALM"), &login).expect("failed context");
    assert_eq!(context.principal(), Some("etl@REALM"));
    assert_eq!(*login.principals.borrow(), vec!["etl@REALM".to_string()]);
  }

  #[test]
  fn test_kerberos_requires_principal() {
    assert!(AuthContext::create(true, None, &TicketCache).is_err());
    assert!(AuthContext::create(true, Some(""), &TicketCache).is_err());
  }

  #[test]
  fn test_failed_login_keeps_kind() {
    let error = AuthContext::create(true, Some("etl"), &FailingLogin).expect_err("login should fail");
    assert_eq!(error.kind(), io::ErrorKind::PermissionDenied);
  }

  #[async_std::test]
  async fn test_run_annotates_errors() {
    let context = AuthContext::create(false, None, &TicketCache).expect("failed context");
    let error = context
      .run("list databases", async { Err::<(), _>(io::Error::new(io::ErrorKind::Other, "boom")) })
      .await
      .expect_err("action should fail");
    assert_eq!(error.to_string(), "unable to list databases - boom");
  }
}
