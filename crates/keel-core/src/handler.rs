//! Handler contracts.
//!
//! A route's terminal handler is either an inline async callable or a
//! `"target@action"` reference. References are resolved through the
//! [`Container`](crate::Container) to a [`Controller`] whose action is then
//! invoked with the route parameters.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{KeelError, KeelResult, Reply, Request, RouteParams};

/// A boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased inline handler.
pub type HandlerFn =
    Arc<dyn Fn(Request, RouteParams) -> BoxFuture<'static, KeelResult<Reply>> + Send + Sync>;

/// A controller whose actions are addressed by name.
///
/// Controllers are constructed through the container (so they receive their
/// dependencies by injection) and then asked to run one action.
///
/// # Example
///
/// ```rust
/// use keel_core::{BoxFuture, Controller, KeelResult, Reply, Request, RouteParams};
/// use keel_core::handler::unknown_action;
///
/// struct PostController;
///
/// impl PostController {
///     async fn show(&self, params: RouteParams) -> KeelResult<Reply> {
///         Ok(format!("post {}", params.get("id").unwrap_or("?")).into())
///     }
/// }
///
/// impl Controller for PostController {
///     fn call(&self, action: &str, _request: Request, params: RouteParams) -> BoxFuture<'_, KeelResult<Reply>> {
///         match action {
///             "show" => Box::pin(self.show(params)),
///             other => Box::pin(std::future::ready(Err(unknown_action("PostController", other)))),
///         }
///     }
/// }
/// ```
pub trait Controller: Send + Sync + 'static {
    /// Runs `action` with the request and the matched route parameters.
    fn call(
        &self,
        action: &str,
        request: Request,
        params: RouteParams,
    ) -> BoxFuture<'_, KeelResult<Reply>>;
}

/// Error for an action name a controller does not provide.
#[must_use]
pub fn unknown_action(controller: &str, action: &str) -> KeelError {
    KeelError::configuration(format!(
        "controller '{controller}' has no action '{action}'"
    ))
}

/// A route's terminal handler.
#[derive(Clone)]
pub enum Handler {
    /// An inline async callable.
    Inline(HandlerFn),
    /// A controller action, written `"target@action"`.
    Action {
        /// Container key of the controller.
        target: String,
        /// Action name passed to [`Controller::call`].
        action: String,
    },
}

impl Handler {
    /// Wraps an async closure as a handler.
    ///
    /// # Example
    ///
    /// ```rust
    /// use keel_core::{Handler, KeelResult, Request, RouteParams};
    ///
    /// let handler = Handler::inline(|_req: Request, params: RouteParams| async move {
    ///     KeelResult::Ok(format!("hello {}", params.get("name").unwrap_or("world")))
    /// });
    /// assert_eq!(handler.describe(), "closure");
    /// ```
    pub fn inline<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Request, RouteParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = KeelResult<R>> + Send + 'static,
        R: Into<Reply>,
    {
        let f = Arc::new(f);
        Self::Inline(Arc::new(move |request, params| {
            let f = Arc::clone(&f);
            Box::pin(async move { f(request, params).await.map(Into::into) })
        }))
    }

    /// Parses a `"target@action"` reference.
    ///
    /// A reference without `@` keeps an empty action, which is rejected when
    /// the route table is built.
    #[must_use]
    pub fn action(reference: &str) -> Self {
        let (target, action) = reference.split_once('@').unwrap_or((reference, ""));
        Self::Action {
            target: target.trim().to_string(),
            action: action.trim().to_string(),
        }
    }

    /// Checks that an action reference names both a target and an action.
    pub fn validate(&self) -> KeelResult<()> {
        match self {
            Self::Action { target, action } if target.is_empty() || action.is_empty() => {
                Err(KeelError::configuration(format!(
                    "handler reference '{target}@{action}' must be written as 'target@action'"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Returns a printable description for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Inline(_) => "closure".to_string(),
            Self::Action { target, action } => format!("{target}@{action}"),
        }
    }
}

impl From<&str> for Handler {
    fn from(reference: &str) -> Self {
        Self::action(reference)
    }
}

impl From<String> for Handler {
    fn from(reference: String) -> Self {
        Self::action(&reference)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.describe()).finish()
    }
}
