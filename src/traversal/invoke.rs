//! Invocation loop
//!
//! Calls the located resource. A resource may answer with another resource
//! instead of a response; the loop keeps going until something returns a
//! concrete `Response`.

use super::resource::{HandlerResult, Resource};
use crate::error::Error;
use crate::http::{Request, Response};

/// Default cap on consecutive delegations for one request
pub const DEFAULT_MAX_DELEGATIONS: usize = 64;

/// Invoke `resource` and follow delegations until a response appears.
///
/// Delegating to a resource without the respond capability is a
/// programming error reported as `Error::NotInvocable`. More than
/// `max_delegations` hops is `Error::DelegationLimit`.
pub fn invoke(request: &Request, resource: Resource, max_delegations: usize) -> Result<Response, Error> {
    let mut current = resource;
    let mut delegations = 0;

    loop {
        let Some(respond) = current.as_respond() else {
            return Err(Error::NotInvocable {
                path: request.path_segments().to_path(),
            });
        };
        match respond.respond(request)? {
            HandlerResult::Response(response) => return Ok(response),
            HandlerResult::Delegate(next) => {
                if delegations == max_delegations {
                    return Err(Error::DelegationLimit {
                        path: request.path_segments().to_path(),
                        limit: max_delegations,
                    });
                }
                delegations += 1;
                current = next;
            }
        }
    }
}
