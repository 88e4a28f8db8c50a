use crate::error::{HubError, Result};
use std::future::Future;
use std::process::Stdio;
use tokio::process::Command;

/// 外部命令执行结果
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// 命令是否正常退出
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// 合并 stdout 和 stderr 的文本输出
    pub fn combined_output(&self) -> String {
        let mut combined = String::from_utf8_lossy(&self.stdout).into_owned();
        if !self.stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&String::from_utf8_lossy(&self.stderr));
        }
        combined
    }
}

/// 外部命令执行器
///
/// 备份管理器通过该接口调用数据库导出/恢复命令，测试中以内存实现替换，
/// 不触发真实子进程。
pub trait CommandRunner: Send + Sync {
    /// 执行命令并捕获输出，运行到进程退出为止
    fn run(
        &self,
        program: &str,
        args: &[String],
    ) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// 基于系统子进程的执行器
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        // 先确认命令存在，给出比启动失败更友好的错误信息
        if which::which(program).is_err() {
            return Err(HubError::custom(format!(
                "{program} 未安装或不在 PATH 中"
            )));
        }

        let output = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program() {
        let runner = SystemCommandRunner;
        let result = runner
            .run("definitely-not-a-real-binary-42", &[])
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_combined_output() {
        let output = CommandOutput {
            exit_code: Some(1),
            stdout: b"out".to_vec(),
            stderr: b"err".to_vec(),
        };
        assert!(!output.success());
        assert_eq!(output.combined_output(), "out\nerr");
    }
}
