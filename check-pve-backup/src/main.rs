use check_pve_backup::{CliApp, Cli, project_info, render_error, render_verdict, setup_logging};
use clap::Parser;
use clap::error::ErrorKind;
use pve_backup_core::verdict::Severity;
use tracing::{debug, error};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // 参数错误也要按监控约定以 UNKNOWN 退出
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                std::process::exit(0);
            }
            _ => {
                let _ = e.print();
                let reason = e.kind().as_str().unwrap_or("参数错误");
                println!("{} - 参数错误: {}", Severity::Unknown.label(), reason);
                std::process::exit(Severity::Unknown.exit_code());
            }
        },
    };

    setup_logging(cli.debug);
    debug!("{}", project_info::get_full_version_string());

    let app = CliApp::new(cli);
    let format = app.output_format();
    let code = match app.check().await {
        Ok(verdict) => {
            println!("{}", render_verdict(&verdict, format));
            verdict.exit_code()
        }
        Err(e) => {
            error!("检查失败: {}", e);
            println!("{}", render_error(&e.to_string(), format));
            Severity::Unknown.exit_code()
        }
    };
    std::process::exit(code);
}
