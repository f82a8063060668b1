//! 批处理工作池
//!
//! 把相互独立的条目（一行文本、一个剧情文件、一首歌词）当作无状态的
//! map操作并行处理。单个条目的失败在工作边界处被捕获并汇总，
//! 不会中断其它条目，也不会让整个池子退出。

use crate::utils::TlError;
use rayon::prelude::*;

/// 单个条目的失败记录
#[derive(Debug)]
pub struct ItemFailure {
    /// 条目标识（文件名、表名等）
    pub label: String,
    /// 错误描述
    pub error: String,
}

/// 一次批处理的汇总结果
#[derive(Debug)]
pub struct BatchOutcome<R> {
    /// 成功条目的结果（完成顺序不定）
    pub results: Vec<R>,
    /// 失败条目
    pub failures: Vec<ItemFailure>,
}

impl<R> BatchOutcome<R> {
    pub fn ok_count(&self) -> usize {
        self.results.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// 打印失败条目的诊断信息
    pub fn report_failures(&self) {
        for failure in &self.failures {
            eprintln!("条目处理失败 {}: {}", failure.label, failure.error);
        }
    }
}

/// 并行处理一批相互独立的条目
///
/// # 参数
/// * `items` - 待处理条目
/// * `label` - 为条目生成诊断标识
/// * `worker` - 条目处理函数，只读共享状态
///
/// # 行为
/// 结果不保证与输入同序；每个条目的错误被收进 `failures`，
/// 不向外传播。
pub fn run_batch<T, R, L, F>(items: Vec<T>, label: L, worker: F) -> BatchOutcome<R>
where
    T: Send + Sync,
    R: Send,
    L: Fn(&T) -> String + Send + Sync,
    F: Fn(&T) -> Result<R, TlError> + Send + Sync,
{
    let outcomes: Vec<Result<R, ItemFailure>> = items
        .par_iter()
        .map(|item| {
            worker(item).map_err(|e| ItemFailure {
                label: label(item),
                error: e.to_string(),
            })
        })
        .collect();

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(r) => results.push(r),
            Err(f) => failures.push(f),
        }
    }

    BatchOutcome { results, failures }
}
