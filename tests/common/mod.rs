//! 集成测试共用的脚本化协作方
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use quiz_chain_solver::clients::{Collaborators, DatasetAnalyzer, LanguageModel, PageFetcher, Submitter};
use quiz_chain_solver::config::ChainPolicy;
use quiz_chain_solver::error::{AnswerError, FetchError, SubmitError};
use quiz_chain_solver::models::{AnswerValue, DatasetRef, QuizPage, Submission, SubmitResult};
use quiz_chain_solver::services::QuestionExtractor;
use quiz_chain_solver::{ChainDriver, QuizFlow};

pub const SUBMIT_URL: &str = "https://quiz.test/submit";

pub fn url(n: usize) -> String {
    format!("https://quiz.test/q{}", n)
}

/// 一道普通文字题
pub fn text_page(n: usize) -> QuizPage {
    QuizPage::from_text(
        url(n),
        format!("Question {}: what is the colour of the sky? POST to {}", n, SUBMIT_URL),
    )
}

/// 带内嵌表格的数据题
pub fn dataset_page(n: usize) -> QuizPage {
    let mut page = QuizPage::from_text(
        url(n),
        format!("Sum the values above the cutoff: 10. POST to {}", SUBMIT_URL),
    );
    page.dataset = Some(DatasetRef::Inline("v\n5\n20\n22".into()));
    page
}

/// 抓取脚本中的一步
#[derive(Clone)]
pub enum FetchStep {
    Page(QuizPage),
    Fail,
    Hang,
}

/// 按地址脚本化的抓取器；脚本用完后重复最后一步
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<FetchStep>>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, url: impl Into<String>, steps: Vec<FetchStep>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.into(), steps.into_iter().collect());
        self
    }

    /// 总是返回同一个页面
    pub fn page(self, page: QuizPage) -> Self {
        let url = page.url.clone();
        self.script(url, vec![FetchStep::Page(page)])
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<QuizPage, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        let step = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(url) {
                Some(steps) if steps.len() > 1 => steps.pop_front(),
                Some(steps) => steps.front().cloned(),
                None => None,
            }
        };

        match step {
            Some(FetchStep::Page(page)) => Ok(page),
            Some(FetchStep::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(FetchError::BadStatus {
                    url: url.to_string(),
                    status: 504,
                })
            }
            Some(FetchStep::Fail) | None => Err(FetchError::BadStatus {
                url: url.to_string(),
                status: 503,
            }),
        }
    }
}

/// 固定回复的模型；可先失败若干次
pub struct FakeModel {
    pub reply: String,
    pub calls: Mutex<usize>,
    failures_left: Mutex<usize>,
}

impl FakeModel {
    pub fn new(reply: &str) -> Self {
        Self::failing(0, reply)
    }

    /// 前 `times` 次调用返回错误，之后回复 `reply`
    pub fn failing(times: usize, reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Mutex::new(0),
            failures_left: Mutex::new(times),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn complete(&self, _prompt: &str) -> Result<String, AnswerError> {
        *self.calls.lock().unwrap() += 1;

        let mut failures_left = self.failures_left.lock().unwrap();
        if *failures_left > 0 {
            *failures_left -= 1;
            return Err(AnswerError::Empty { collaborator: "LLM" });
        }
        Ok(self.reply.clone())
    }
}

/// 固定结果的数据分析器
pub struct FakeAnalyzer(pub AnswerValue);

#[async_trait]
impl DatasetAnalyzer for FakeAnalyzer {
    async fn analyze(&self, _dataset: &DatasetRef, _prompt: &str) -> Result<AnswerValue, AnswerError> {
        Ok(self.0.clone())
    }
}

/// 提交脚本中的一步
#[derive(Clone)]
pub enum SubmitStep {
    Reply(SubmitResult),
    Fail,
}

/// 脚本化的提交器；脚本用完后重复最后一步
pub struct ScriptedSubmitter {
    steps: Mutex<VecDeque<SubmitStep>>,
    pub submissions: Mutex<Vec<Submission>>,
}

impl ScriptedSubmitter {
    pub fn new(steps: Vec<SubmitStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Submitter for ScriptedSubmitter {
    async fn submit(&self, submission: &Submission) -> Result<SubmitResult, SubmitError> {
        self.submissions.lock().unwrap().push(submission.clone());

        let step = {
            let mut steps = self.steps.lock().unwrap();
            if steps.len() > 1 {
                steps.pop_front()
            } else {
                steps.front().cloned()
            }
        };

        match step {
            Some(SubmitStep::Reply(result)) => Ok(result),
            Some(SubmitStep::Fail) | None => Err(SubmitError::BadStatus {
                endpoint: submission.submit_url.clone(),
                status: 500,
                body: "internal error".into(),
            }),
        }
    }
}

/// 测试用策略：不等待，超时足够长
pub fn policy(max_attempts: u32) -> ChainPolicy {
    ChainPolicy {
        max_attempts,
        max_chain_length: 25,
        fetch_timeout: Duration::from_secs(5),
        answer_timeout: Duration::from_secs(5),
        submit_timeout: Duration::from_secs(5),
        retry_delay: Duration::ZERO,
    }
}

/// 测试夹具：持有协作方引用以便断言
pub struct Harness {
    pub fetcher: Arc<ScriptedFetcher>,
    pub model: Arc<FakeModel>,
    pub submitter: Arc<ScriptedSubmitter>,
    pub driver: ChainDriver,
}

impl Harness {
    pub fn new(fetcher: ScriptedFetcher, submitter: ScriptedSubmitter, policy: ChainPolicy) -> Self {
        Self::with_analyzer(fetcher, submitter, AnswerValue::Integer(42), policy)
    }

    pub fn with_analyzer(
        fetcher: ScriptedFetcher,
        submitter: ScriptedSubmitter,
        analyzed: AnswerValue,
        policy: ChainPolicy,
    ) -> Self {
        Self::build(fetcher, FakeModel::new("Blue"), submitter, analyzed, policy)
    }

    pub fn with_model(
        fetcher: ScriptedFetcher,
        model: FakeModel,
        submitter: ScriptedSubmitter,
        policy: ChainPolicy,
    ) -> Self {
        Self::build(fetcher, model, submitter, AnswerValue::Integer(42), policy)
    }

    fn build(
        fetcher: ScriptedFetcher,
        model: FakeModel,
        submitter: ScriptedSubmitter,
        analyzed: AnswerValue,
        policy: ChainPolicy,
    ) -> Self {
        let fetcher = Arc::new(fetcher);
        let model = Arc::new(model);
        let submitter = Arc::new(submitter);

        let collaborators = Collaborators {
            fetcher: fetcher.clone(),
            model: model.clone(),
            analyzer: Arc::new(FakeAnalyzer(analyzed)),
            submitter: submitter.clone(),
        };
        let flow = QuizFlow::new(&collaborators, QuestionExtractor::new(None), policy, false);

        Self {
            fetcher,
            model,
            submitter,
            driver: ChainDriver::new(flow),
        }
    }
}
