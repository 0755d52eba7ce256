//! 交互式排序会话
//!
//! 在终端中显示文件列表，逐条命令调整顺序，最后生成排序文件。
//! 输入输出都是泛型，测试时可以直接喂字符串。
//!
//! ```text
//! list              显示当前顺序
//! mv <from> <to>    把第 from 项拖到第 to 项的位置
//! up [n] / down [n] 与相邻项交换（省略 n 时使用当前选中项）
//! select <n>        选中第 n 项
//! gen               生成排序文件并结束
//! quit              放弃并退出
//! ```

use crate::error::{AppResult, OrderError};
use crate::models::OrderList;
use crate::services::ordering::{initial_order, load_order_file, write_artifact, write_master_order};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 会话状态：显示 → 调整中 → 已写出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Displayed,
    Reordering,
    Written,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    List,
    Move { from: usize, to: usize },
    Up(Option<usize>),
    Down(Option<usize>),
    Select(usize),
    Generate,
    Help,
    Quit,
}

impl Command {
    /// 解析一行输入，序号从 1 开始
    fn parse(line: &str) -> AppResult<Self> {
        let mut parts = line.split_whitespace();
        let word = parts.next().unwrap_or("").to_lowercase();
        let args: Vec<&str> = parts.collect();

        let index = |s: &str| -> AppResult<usize> {
            match s.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(n - 1),
                _ => Err(OrderError::UnknownCommand(line.to_string()).into()),
            }
        };
        let optional = |args: &[&str]| -> AppResult<Option<usize>> {
            args.first().map(|s| index(*s)).transpose()
        };

        Ok(match (word.as_str(), args.as_slice()) {
            ("list" | "ls" | "l", []) => Command::List,
            ("mv" | "move", [from, to]) => Command::Move {
                from: index(*from)?,
                to: index(*to)?,
            },
            ("up" | "u", rest) if rest.len() <= 1 => Command::Up(optional(rest)?),
            ("down" | "d", rest) if rest.len() <= 1 => Command::Down(optional(rest)?),
            ("select" | "sel" | "s", [n]) => Command::Select(index(*n)?),
            ("gen" | "generate" | "g", []) => Command::Generate,
            ("help" | "h" | "?", []) => Command::Help,
            ("quit" | "q" | "exit", []) => Command::Quit,
            _ => return Err(OrderError::UnknownCommand(line.to_string()).into()),
        })
    }
}

/// 会话结果
#[derive(Debug, Clone, Default)]
pub struct SessionOutcome {
    /// 带时间戳的排序文件
    pub artifact: Option<PathBuf>,
    /// 同时更新的 order.txt
    pub master: Option<PathBuf>,
}

pub struct OrderSession {
    folder: PathBuf,
    list: OrderList,
    state: SessionState,
    update_master: bool,
}

impl OrderSession {
    /// 从文件夹扫描初始顺序
    ///
    /// 文件夹为空或不可读时直接返回错误，不会写出任何文件。
    pub fn from_folder(folder: &Path) -> AppResult<Self> {
        let items = initial_order(folder)?;
        Ok(Self::with_items(folder.to_path_buf(), items))
    }

    /// 从已有排序文件继续
    pub fn from_order_file(order_path: &Path) -> AppResult<Self> {
        let loaded = load_order_file(order_path)?;
        Ok(Self::with_items(loaded.folder, loaded.resolved))
    }

    pub fn with_items(folder: PathBuf, items: Vec<String>) -> Self {
        Self {
            folder,
            list: OrderList::new(items),
            state: SessionState::Displayed,
            update_master: true,
        }
    }

    /// 生成时是否同时覆盖 order.txt
    pub fn update_master(mut self, yes: bool) -> Self {
        self.update_master = yes;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn items(&self) -> &[String] {
        self.list.items()
    }

    /// 运行会话直到生成、退出或输入结束
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> AppResult<SessionOutcome> {
        self.render(out)?;
        writeln!(out, "输入 help 查看命令")?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let command = match Command::parse(line) {
                Ok(c) => c,
                Err(e) => {
                    writeln!(out, "⚠️ {}", e)?;
                    continue;
                }
            };

            match self.apply(command, out) {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {}
                Err(e) if e.is_item_level() || matches!(e, crate::AppError::Order(_)) => {
                    writeln!(out, "⚠️ {}", e)?;
                }
                Err(e) => return Err(e),
            }
        }

        warn!("输入结束，未生成排序文件");
        Ok(SessionOutcome::default())
    }

    fn apply<W: Write>(&mut self, command: Command, out: &mut W) -> AppResult<Option<SessionOutcome>> {
        match command {
            Command::List => self.render(out)?,
            Command::Help => writeln!(
                out,
                "list | mv <from> <to> | up [n] | down [n] | select <n> | gen | quit"
            )?,
            Command::Select(i) => {
                self.list.select(i)?;
                self.render(out)?;
            }
            Command::Move { from, to } => {
                self.list.move_item(from, to)?;
                self.state = SessionState::Reordering;
                self.render(out)?;
            }
            Command::Up(i) => {
                let i = self.target(i)?;
                self.list.move_up(i)?;
                self.state = SessionState::Reordering;
                self.render(out)?;
            }
            Command::Down(i) => {
                let i = self.target(i)?;
                self.list.move_down(i)?;
                self.state = SessionState::Reordering;
                self.render(out)?;
            }
            Command::Generate => {
                let outcome = self.generate()?;
                if let Some(path) = &outcome.artifact {
                    writeln!(out, "✓ 排序文件: {}", path.display())?;
                }
                if let Some(path) = &outcome.master {
                    writeln!(out, "✓ 主排序文件: {}", path.display())?;
                }
                return Ok(Some(outcome));
            }
            Command::Quit => {
                writeln!(out, "已退出，未生成排序文件")?;
                return Ok(Some(SessionOutcome::default()));
            }
        }
        Ok(None)
    }

    fn target(&self, explicit: Option<usize>) -> AppResult<usize> {
        explicit
            .or(self.list.selected())
            .ok_or_else(|| OrderError::NothingSelected.into())
    }

    /// 写出排序文件
    pub fn generate(&mut self) -> AppResult<SessionOutcome> {
        let artifact = write_artifact(&self.folder, self.list.items(), chrono::Local::now())?;
        let master = if self.update_master {
            Some(write_master_order(&self.folder, self.list.items())?)
        } else {
            None
        };
        self.state = SessionState::Written;
        info!("✓ 已写出 {} 个条目的顺序", self.list.len());
        Ok(SessionOutcome {
            artifact: Some(artifact),
            master,
        })
    }

    fn render<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let width = self.list.len().to_string().len();
        for (i, name) in self.list.items().iter().enumerate() {
            let marker = if self.list.selected() == Some(i) { '>' } else { ' ' };
            writeln!(out, "{} {:>width$}. {}", marker, i + 1, name, width = width)?;
        }
        Ok(())
    }
}
