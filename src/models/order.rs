//! 可重新排序的文件列表
//!
//! 拖拽被拆解为"取出 → 插入到新位置"的离散操作，
//! 上移/下移是相邻交换。索引一律从 0 开始，界面层负责 1-based 显示。

use crate::error::{AppResult, OrderError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderList {
    items: Vec<String>,
    selected: Option<usize>,
}

impl OrderList {
    pub fn new(items: Vec<String>) -> Self {
        Self {
            items,
            selected: None,
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn into_items(self) -> Vec<String> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// 选中某一项
    pub fn select(&mut self, index: usize) -> AppResult<()> {
        self.check(index)?;
        self.selected = Some(index);
        Ok(())
    }

    /// 拖拽：把 `from` 处的条目移到 `to`，选中项跟随被移动的条目
    pub fn move_item(&mut self, from: usize, to: usize) -> AppResult<()> {
        self.check(from)?;
        self.check(to)?;
        if from != to {
            let item = self.items.remove(from);
            self.items.insert(to, item);
        }
        self.selected = Some(to);
        Ok(())
    }

    /// 与上一项交换；已在顶部时不做任何事
    pub fn move_up(&mut self, index: usize) -> AppResult<()> {
        self.check(index)?;
        if index == 0 {
            self.selected = Some(0);
            return Ok(());
        }
        self.items.swap(index, index - 1);
        self.selected = Some(index - 1);
        Ok(())
    }

    /// 与下一项交换；已在底部时不做任何事
    pub fn move_down(&mut self, index: usize) -> AppResult<()> {
        self.check(index)?;
        if index + 1 == self.items.len() {
            self.selected = Some(index);
            return Ok(());
        }
        self.items.swap(index, index + 1);
        self.selected = Some(index + 1);
        Ok(())
    }

    fn check(&self, index: usize) -> AppResult<()> {
        if index >= self.items.len() {
            return Err(OrderError::IndexOutOfRange {
                index: index + 1,
                len: self.items.len(),
            }
            .into());
        }
        Ok(())
    }
}
