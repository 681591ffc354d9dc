use tracing_subscriber::{
    fmt::{format, time::ChronoLocal},
    EnvFilter,
};

/// Installs the global subscriber. `directive` is added on top of `RUST_LOG`, e.g. `"bid_client=debug"`.
pub fn init_log(directive: Option<&str>) {
    let format = format::format()
        .with_level(true)
        .with_target(false)
        .with_timer(ChronoLocal::new("[%m-%d %H:%M:%S%.3f]".to_string()))
        .compact();

    let mut env_filter = EnvFilter::from_default_env().add_directive("info".parse().expect("static directive"));
    if let Some(directive) = directive {
        match directive.parse() {
            Ok(directive) => env_filter = env_filter.add_directive(directive),
            Err(err) => eprintln!("ignoring log directive `{directive}`: {err}"),
        }
    }

    tracing_subscriber::fmt().with_env_filter(env_filter).event_format(format).init();
}
