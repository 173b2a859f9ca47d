use std::env;
use std::fs::read_to_string;
use std::thread;
use anyhow::{anyhow, Result};
use pledge::{Engine, Promise, Value};
use pledge::ex::node;
use pledge::rt::Spawner;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let mut filter = EnvFilter::from_default_env();
    filter = filter.add_directive(LevelFilter::WARN.into());
    let print = fmt::layer().compact();
    registry().with(filter).with(print).init();

    let engine = Engine::new(Spawner::current()?);
    let path   = env::args().nth(1).unwrap_or_else(|| "Cargo.toml".to_owned());

    let lines = read_file(&engine, path.clone()).map(|text| {
        let text = text.as_data().and_then(|d| d.as_str()).unwrap_or_default();
        Ok(Value::from(text.lines().count() as u64))
    });

    let wrapped = engine.abortable(lines);

    match wrapped.promise.settled().await? {
        Ok(count) => println!("{path}: {count:?} lines"),
        Err(e)    => println!("{path}: failed: {e:?}"),
    }

    Ok(())
}

fn read_file(engine: &Engine, path: String) -> Promise {
    node::adapt(engine, move |callback| {
        thread::spawn(move || match read_to_string(&path) {
            Ok(data) => callback.call(None, data.into()),
            Err(e)   => callback.call(Some(anyhow!(e).into()), Value::null()),
        });
    })
}
