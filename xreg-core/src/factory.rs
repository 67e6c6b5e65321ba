//! Renewable factories: kind-specific construction of candidate jobs.

use std::{fmt, sync::{Arc, Weak}};

use tokio_util::sync::CancellationToken;
use xreg_model::{Bck, XactArgs, XactId, XactKind, XactScope};

use crate::error::Result;
use crate::registry::Tracker;
use crate::xaction::{Xact, XactBody, XactHandle};

/// One factory per kind, registered at bootstrap.
///
/// `new_candidate` must be pure construction: no I/O, no spawned work. The
/// registry starts the candidate only after deciding to admit it, so a
/// candidate that ends up joining an existing job is simply dropped.
pub trait Renewable: Send + Sync {
    fn kind(&self) -> XactKind;

    fn scope(&self) -> XactScope {
        self.kind().scope()
    }

    fn new_candidate(&self, args: XactArgs, bck: &Bck) -> Result<Candidate>;
}

/// A constructed but not yet admitted job.
pub struct Candidate {
    kind: XactKind,
    id: XactId,
    bck: Bck,
    args: Arc<XactArgs>,
    body: Box<dyn XactBody>,
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("bck", &self.bck)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl Candidate {
    /// Validates `args` against `kind` and takes the caller id, generating
    /// one when absent.
    pub fn new(
        kind: XactKind,
        args: XactArgs,
        bck: &Bck,
        body: Box<dyn XactBody>,
    ) -> Result<Self> {
        args.custom.validate_for(kind)?;
        Ok(Self::assemble(kind, args, bck, body))
    }

    fn assemble(
        kind: XactKind,
        args: XactArgs,
        bck: &Bck,
        body: Box<dyn XactBody>,
    ) -> Self {
        let id = args.uuid.clone().unwrap_or_else(XactId::generate);
        Self {
            kind,
            id,
            bck: bck.clone(),
            args: Arc::new(args),
            body,
        }
    }

    pub fn kind(&self) -> XactKind {
        self.kind
    }

    pub fn id(&self) -> &XactId {
        &self.id
    }

    pub fn bck(&self) -> &Bck {
        &self.bck
    }

    pub fn args(&self) -> &XactArgs {
        &self.args
    }

    pub(crate) fn into_xact(
        self,
        buckets: Vec<Bck>,
        cancel: CancellationToken,
        tracker: Weak<Tracker>,
    ) -> (XactHandle, Box<dyn XactBody>) {
        let xact = Xact::new(
            self.kind, self.id, self.bck, buckets, self.args, cancel, tracker,
        );
        (Arc::new(xact), self.body)
    }
}

/// Factory built from a body constructor closure.
///
/// ```no_run
/// use xreg_core::{BodyFactory, XactBody, XactContext, Result};
/// use xreg_model::XactKind;
///
/// struct Warmup;
///
/// #[async_trait::async_trait]
/// impl XactBody for Warmup {
///     async fn run(self: Box<Self>, _ctx: XactContext) -> Result<()> {
///         Ok(())
///     }
/// }
///
/// let factory = BodyFactory::new(XactKind::LoadLomCache, |_args, _bck| {
///     Ok(Box::new(Warmup) as Box<dyn XactBody>)
/// });
/// ```
pub struct BodyFactory<F> {
    kind: XactKind,
    make: F,
}

impl<F> BodyFactory<F>
where
    F: Fn(&XactArgs, &Bck) -> Result<Box<dyn XactBody>> + Send + Sync,
{
    pub fn new(kind: XactKind, make: F) -> Self {
        Self { kind, make }
    }
}

impl<F> fmt::Debug for BodyFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyFactory")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<F> Renewable for BodyFactory<F>
where
    F: Fn(&XactArgs, &Bck) -> Result<Box<dyn XactBody>> + Send + Sync,
{
    fn kind(&self) -> XactKind {
        self.kind
    }

    fn new_candidate(&self, args: XactArgs, bck: &Bck) -> Result<Candidate> {
        // reject bad payloads before the body constructor sees them
        args.custom.validate_for(self.kind)?;
        let body = (self.make)(&args, bck)?;
        Ok(Candidate::assemble(self.kind, args, bck, body))
    }
}
