use clap::Parser;
use mlops_smoke::aws::{ClientConfig, CONTROL_PLANE_URL_ENV, RUNTIME_URL_ENV};
use mlops_smoke::checks::{ConsoleReporter, VerificationRunner};
use mlops_smoke::config::{
    AwsOptions, Targets, DEFAULT_ENDPOINT_NAME, DEFAULT_MODEL_PACKAGE_GROUP_NAME,
    ENDPOINT_NAME_ENV, MODEL_PACKAGE_GROUP_NAME_ENV,
};
use mlops_smoke::error::{CheckError, FAILURE_EXIT_CODE};
use mlops_smoke::logging;

#[derive(Parser)]
#[command(name = "mlops-smoke")]
#[command(
    about = "Smoke-test a SageMaker deployment: registry, endpoint status, inference",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Model package group expected to hold the registered model
    #[arg(long = "model-package-group", env = MODEL_PACKAGE_GROUP_NAME_ENV, default_value = DEFAULT_MODEL_PACKAGE_GROUP_NAME)]
    model_package_group_name: String,

    /// Endpoint expected to be InService
    #[arg(long = "endpoint", env = ENDPOINT_NAME_ENV, default_value = DEFAULT_ENDPOINT_NAME)]
    endpoint_name: String,

    /// AWS region (falls back to AWS_DEFAULT_REGION and the shared config file)
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Named profile from the shared AWS config and credentials files
    #[arg(long, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// Override the SageMaker API endpoint URL
    #[arg(long, env = CONTROL_PLANE_URL_ENV)]
    control_plane_url: Option<String>,

    /// Override the SageMaker runtime endpoint URL
    #[arg(long, env = RUNTIME_URL_ENV)]
    runtime_url: Option<String>,

    /// Log client requests to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn targets(&self) -> Targets {
        Targets::new(&self.model_package_group_name, &self.endpoint_name)
    }

    fn aws_options(&self) -> AwsOptions {
        AwsOptions {
            region: self.region.clone(),
            profile: self.profile.clone(),
            control_plane_url: self.control_plane_url.clone(),
            runtime_url: self.runtime_url.clone(),
        }
    }
}

fn execute(targets: &Targets, options: &AwsOptions) -> Result<(), CheckError> {
    targets.validate()?;

    let config = ClientConfig::resolve(options)?;
    let (control, runtime) = config.build_clients()?;

    VerificationRunner::new(&control, &runtime, targets, ConsoleReporter).run()?;
    Ok(())
}

fn main() {
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        let _ = e.print();
        let code = if e.use_stderr() { FAILURE_EXIT_CODE } else { 0 };
        std::process::exit(code);
    });
    logging::init(cli.verbose);

    if let Err(e) = execute(&cli.targets(), &cli.aws_options()) {
        tracing::debug!(error = ?e, "smoke test failed");
        println!("{}", e.report_line());
        std::process::exit(e.exit_code());
    }
}
