use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use kernel_stamper::io::{ArtifactStore, DirStore, MemoryStore};
use kernel_stamper::palette;
use kernel_stamper::{Artifact, EditCommand, FieldSet, RomLibrary};

#[derive(Parser)]
#[command(name = "kernel_stamper")]
#[command(about = "在 C64 kernal ROM 中写入开机画面文字与颜色")]
#[command(version)]
struct Cli {
    /// ROM 库目录
    #[arg(long, global = true, env = "KERNEL_STAMPER_STORE", default_value = ".kernel-stamper")]
    store: PathBuf,

    /// 静默模式(仅输出错误)
    #[arg(long, global = true)]
    quiet: bool,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 导入 ROM 文件(.bin/.rom)
    Import {
        file: PathBuf,
        /// 库中显示的名称(默认使用文件名)
        #[arg(long)]
        name: Option<String>,
    },
    /// 列出库中的 ROM
    List,
    /// 显示字段、历史摘要与开机画面预览
    Show { id: String },
    /// 按顺序执行编辑命令并保存
    ///
    /// 命令: line1=TEXT, line2=TEXT, border=N, background=N, text=N, undo, redo
    Edit {
        id: String,
        #[arg(required = true)]
        ops: Vec<String>,
        /// 只预览结果，不写入库
        #[arg(long)]
        dry_run: bool,
    },
    /// 显示变更历史
    History { id: String },
    /// 导出 ROM 原始字节
    Export { id: String, output: PathBuf },
    /// 重命名
    Rename { id: String, name: String },
    /// 复制一份 ROM
    Duplicate {
        id: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// 删除 ROM 及其历史
    Delete { id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let store = DirStore::open(&cli.store)
        .with_context(|| format!("无法打开 ROM 库: {:?}", cli.store))?;
    let mut library = RomLibrary::new(store);

    match &cli.command {
        Command::Import { file, name } => handle_import(&cli, &mut library, file, name.as_deref()),
        Command::List => handle_list(&library),
        Command::Show { id } => handle_show(&library, id),
        Command::Edit { id, ops, dry_run } => handle_edit(&cli, library, id, ops, *dry_run),
        Command::History { id } => handle_history(&library, id),
        Command::Export { id, output } => handle_export(&cli, &mut library, id, output),
        Command::Rename { id, name } => {
            let artifact = library.rename(id, name)?;
            if !cli.quiet {
                println!("已重命名 {} -> {}", artifact.id, artifact.name);
            }
            Ok(())
        }
        Command::Duplicate { id, name } => {
            let copy = library.duplicate(id, name.as_deref())?;
            if !cli.quiet {
                println!("已复制 {} -> {} ({})", id, copy.id, copy.name);
            }
            Ok(())
        }
        Command::Delete { id } => {
            library.delete(id)?;
            if !cli.quiet {
                println!("已删除 {}", id);
            }
            Ok(())
        }
    }
}

/// 初始化日志：默认 warn，`-v` 为 debug，`--quiet` 为 error；`RUST_LOG` 优先
fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        log::LevelFilter::Error
    } else if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

/// 处理导入
fn handle_import(
    cli: &Cli,
    library: &mut RomLibrary<DirStore>,
    file: &Path,
    name: Option<&str>,
) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("读取文件失败: {:?}", file))?;
    let name = match name {
        Some(name) => name.to_string(),
        None => file
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .with_context(|| format!("无法确定文件名: {:?}", file))?,
    };

    let outcome = library.import(&name, bytes)?;
    if !cli.quiet {
        println!("已导入 {} ({} bytes)，ID: {}", outcome.artifact.name, outcome.artifact.size, outcome.artifact.id);
        for warning in &outcome.warnings {
            println!("  注意: {}", warning);
        }
    }
    Ok(())
}

/// 处理列表
fn handle_list(library: &RomLibrary<DirStore>) -> Result<()> {
    let artifacts = library.list()?;
    if artifacts.is_empty() {
        println!("库中还没有 ROM 文件");
        return Ok(());
    }

    for artifact in &artifacts {
        let edits = artifact.metadata.change_count;
        println!(
            "{}  {}  {:.2} KB • {} • {} edit{}",
            artifact.id,
            artifact.name,
            artifact.size as f64 / 1024.0,
            artifact.upload_date.format("%Y-%m-%d"),
            edits,
            if edits == 1 { "" } else { "s" }
        );
    }
    Ok(())
}

/// 处理显示
fn handle_show(library: &RomLibrary<DirStore>, id: &str) -> Result<()> {
    let artifact = library.get(id)?;
    let fields = kernel_stamper::decode(&artifact.payload)?;
    let history = library.history(id)?;

    print_artifact(&artifact);
    print_fields(&fields);
    println!("历史: {}", history.summary());
    println!();
    println!("{}", palette::render_screen(&fields).replace('\r', "\n"));
    Ok(())
}

/// 处理编辑
///
/// `--dry-run` 时在内存副本上执行，库中的字节与历史都不受影响
fn handle_edit(
    cli: &Cli,
    library: RomLibrary<DirStore>,
    id: &str,
    ops: &[String],
    dry_run: bool,
) -> Result<()> {
    let commands = ops
        .iter()
        .map(|op| op.parse::<EditCommand>())
        .collect::<Result<Vec<_>, _>>()?;

    if dry_run {
        let mut scratch = MemoryStore::new();
        scratch.put_artifact(&library.get(id)?)?;
        if let Some(record) = library.store().get_history(id)? {
            scratch.put_history(&record)?;
        }
        let mut scratch = RomLibrary::new(scratch);
        run_commands(cli, &mut scratch, id, &commands, false)
    } else {
        let mut library = library;
        run_commands(cli, &mut library, id, &commands, true)
    }
}

/// 依次执行命令；中途失败时先保存已生效的修改，再返回错误
fn run_commands<S: ArtifactStore>(
    cli: &Cli,
    library: &mut RomLibrary<S>,
    id: &str,
    commands: &[EditCommand],
    save: bool,
) -> Result<()> {
    library.open(id)?;

    let mut changed = false;
    let mut failure = None;
    for command in commands {
        match library.apply(command) {
            Ok(effective) => {
                changed |= effective;
                if !cli.quiet {
                    println!("{} {}", if effective { "✓" } else { "·" }, command);
                }
            }
            Err(e) => {
                failure = Some(anyhow::Error::new(e).context(format!("命令失败: {}", command)));
                break;
            }
        }
    }

    if changed && save {
        let saved = library.save()?;
        if !cli.quiet {
            println!("已保存 {} (第 {} 次编辑)", saved.name, saved.metadata.change_count);
        }
    }

    if !cli.quiet {
        if let Some(session) = library.session() {
            print_fields(session.fields());
            println!("历史: {}", session.summary());
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// 处理历史
fn handle_history(library: &RomLibrary<DirStore>, id: &str) -> Result<()> {
    let history = library.history(id)?;
    println!("{}", history.summary());

    let cursor = history.cursor();
    for (index, change) in history.iter().enumerate() {
        let marker = if index as isize == cursor {
            "→"
        } else if index as isize > cursor {
            "↷"
        } else {
            " "
        };
        println!("{} {:>2}. {}", marker, index + 1, change);
    }
    Ok(())
}

/// 处理导出
fn handle_export(
    cli: &Cli,
    library: &mut RomLibrary<DirStore>,
    id: &str,
    output: &Path,
) -> Result<()> {
    let bytes = library.export(id)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, &bytes).with_context(|| format!("写入文件失败: {:?}", output))?;

    if !cli.quiet {
        println!("已导出 {} bytes 到 {:?}", bytes.len(), output);
    }
    Ok(())
}

fn print_artifact(artifact: &Artifact) {
    println!("=== {} ===", artifact.name);
    println!("ID: {}", artifact.id);
    println!("大小: {} bytes", artifact.size);
    println!("导入时间: {}", artifact.upload_date.format("%Y-%m-%d %H:%M:%S"));
    println!("修改时间: {}", artifact.last_modified.format("%Y-%m-%d %H:%M:%S"));
    println!("编辑次数: {}", artifact.metadata.change_count);
    match &artifact.metadata.parent_id {
        Some(parent) => println!("复制自: {}", parent),
        None if artifact.metadata.is_original => println!("来源: 原始导入"),
        None => {}
    }
}

fn print_fields(fields: &FieldSet) {
    println!("line1: [{}]", fields.line1);
    println!("line2: [{}]", fields.line2);
    println!("border: {}", palette::describe(fields.border_color));
    println!("background: {}", palette::describe(fields.background_color));
    println!("text: {}", palette::describe(fields.text_color));
}
