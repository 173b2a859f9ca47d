#[cfg(not(feature = "tokio"))]
use crossbeam_channel::{bounded, Sender, Receiver, TryRecvError};
#[cfg(feature = "tokio")]
use std::{future::Future, pin::Pin, task::{Context, Poll}};
use anyhow::{anyhow, Result};
#[cfg(feature = "tokio")]
use tokio::sync::oneshot::{channel, error::TryRecvError, Sender, Receiver};
use crate::vm::Value;

type Settled = std::result::Result<Value, Value>;

pub struct Tx(Sender<Settled>);

/// Receives the outcome of one promise.
pub struct Rx(Receiver<Settled>);

#[cfg(feature = "tokio")]
pub fn oneshot() -> (Tx, Rx) {
    let (tx, rx) = channel();
    (Tx(tx), Rx(rx))
}

#[cfg(not(feature = "tokio"))]
pub fn oneshot() -> (Tx, Rx) {
    let (tx, rx) = bounded(1);
    (Tx(tx), Rx(rx))
}

impl Tx {
    pub fn send(self, result: Settled) {
        match self.0.send(result) {
            Ok(()) => (),
            Err(_) => (),
        }
    }
}

#[cfg(not(feature = "tokio"))]
impl Rx {
    /// `None` while the promise is still pending.
    pub fn try_recv(&mut self) -> Result<Option<Settled>> {
        match self.0.try_recv() {
            Ok(r)                            => Ok(Some(r)),
            Err(TryRecvError::Empty)         => Ok(None),
            Err(TryRecvError::Disconnected)  => Err(anyhow!("promise dropped")),
        }
    }
}

#[cfg(feature = "tokio")]
impl Rx {
    /// `None` while the promise is still pending.
    pub fn try_recv(&mut self) -> Result<Option<Settled>> {
        match self.0.try_recv() {
            Ok(r)                      => Ok(Some(r)),
            Err(TryRecvError::Empty)   => Ok(None),
            Err(TryRecvError::Closed)  => Err(anyhow!("promise dropped")),
        }
    }
}

#[cfg(feature = "tokio")]
impl Future for Rx {
    type Output = Result<Settled>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.0).poll(cx) {
            Poll::Ready(Ok(r))  => Poll::Ready(Ok(r)),
            Poll::Ready(Err(e)) => Poll::Ready(Err(e.into())),
            Poll::Pending       => Poll::Pending,
        }
    }
}
