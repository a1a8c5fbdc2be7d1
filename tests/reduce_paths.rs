use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use relay_harness::chunking::{LONG_INPUT_THRESHOLD, TARGET_CHUNK_CHARS};
use relay_harness::proxy::{Provider, ProxyApi, ProxyError, ProxyRequest};
use relay_harness::reduce::{ReduceConfig, ReduceError, Reducer};

const CHUNK_INSTRUCTION: &str = "extract dense bullets";
const FINAL_INSTRUCTION: &str = "structure the meeting notes";

/// What the fake should do for the call at a given index.
#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    Fail,
    Empty,
}

/// Records every completion call: (instruction, input) in arrival order.
struct FakeProxy {
    calls: Mutex<Vec<(String, String)>>,
    behavior: Box<dyn Fn(usize) -> Behavior + Send + Sync>,
}

impl FakeProxy {
    fn succeeding() -> Self {
        Self::with_behavior(|_| Behavior::Succeed)
    }

    fn with_behavior(behavior: impl Fn(usize) -> Behavior + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            behavior: Box::new(behavior),
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProxyApi for FakeProxy {
    async fn call(&self, _req: &ProxyRequest) -> Result<String, ProxyError> {
        unreachable!("reducer goes through complete()")
    }

    async fn complete(&self, req: &ProxyRequest) -> Result<String, ProxyError> {
        let instruction = req.body["system"].as_str().unwrap_or_default().to_string();
        let input = req.body["messages"][0]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((instruction, input));
            calls.len() - 1
        };

        match (self.behavior)(index) {
            Behavior::Succeed => Ok(format!("extract-{index}")),
            Behavior::Fail => Err(ProxyError::Server { status: 500 }),
            Behavior::Empty => Ok(String::new()),
        }
    }
}

fn reducer(proxy: Arc<FakeProxy>) -> Reducer<FakeProxy> {
    Reducer::new(
        proxy,
        ReduceConfig::new(
            Provider::Anthropic,
            "/v1/messages",
            CHUNK_INSTRUCTION,
            FINAL_INSTRUCTION,
        ),
    )
}

#[tokio::test]
async fn short_input_takes_the_direct_path_with_one_call() {
    let proxy = Arc::new(FakeProxy::succeeding());
    let result = reducer(proxy.clone())
        .reduce("a short transcript", "meeting title")
        .await
        .unwrap();

    assert_eq!(result, "extract-0");
    let calls = proxy.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, FINAL_INSTRUCTION);
    assert!(calls[0].1.contains("meeting title"));
    assert!(calls[0].1.contains("a short transcript"));
}

#[tokio::test]
async fn oversized_input_makes_one_call_per_chunk_then_one_final_call() {
    // Lines of 9,999 chars pack 8 per 80,000-char chunk; 25 lines = 4 chunks.
    let line = "a".repeat(9_999);
    let transcript = std::iter::repeat(line.as_str())
        .take(25)
        .collect::<Vec<_>>()
        .join("\n");
    assert!(transcript.len() > LONG_INPUT_THRESHOLD);

    let proxy = Arc::new(FakeProxy::succeeding());
    let result = reducer(proxy.clone())
        .reduce(&transcript, "aux")
        .await
        .unwrap();

    let calls = proxy.calls();
    assert_eq!(calls.len(), 5, "4 chunk calls + 1 final call");

    // Chunk calls are sequential and order-preserving, and reassemble the input.
    let chunk_inputs: Vec<&str> = calls[..4].iter().map(|(_, input)| input.as_str()).collect();
    for (instruction, _) in &calls[..4] {
        assert_eq!(instruction, CHUNK_INSTRUCTION);
    }
    assert_eq!(chunk_inputs.join("\n"), transcript);
    for chunk in &chunk_inputs[..3] {
        assert!(chunk.len() <= TARGET_CHUNK_CHARS);
    }

    // The final call sees labeled intermediates in original chunk order.
    let (final_instruction, final_input) = &calls[4];
    assert_eq!(final_instruction, FINAL_INSTRUCTION);
    assert!(final_input.contains("aux"));
    for part in 1..=4 {
        assert!(final_input.contains(&format!("## Part {part}/4")));
    }
    let positions: Vec<usize> = (0..4)
        .map(|i| final_input.find(&format!("extract-{i}")).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    assert_eq!(result, "extract-4");
}

#[tokio::test]
async fn failed_chunk_aborts_the_whole_reduction() {
    let line = "b".repeat(60);
    let transcript = std::iter::repeat(line.as_str())
        .take(5)
        .collect::<Vec<_>>()
        .join("\n");

    let proxy = Arc::new(FakeProxy::with_behavior(|index| {
        if index == 1 {
            Behavior::Fail
        } else {
            Behavior::Succeed
        }
    }));

    let reducer = Reducer::new(
        proxy.clone(),
        ReduceConfig::new(
            Provider::Anthropic,
            "/v1/messages",
            CHUNK_INSTRUCTION,
            FINAL_INSTRUCTION,
        )
        .limits(100, 70),
    );

    let err = reducer.reduce(&transcript, "").await.unwrap_err();
    match err {
        ReduceError::Chunk { index, .. } => assert_eq!(index, 1),
        other => panic!("expected Chunk error, got {other:?}"),
    }
    // Chunk 0 succeeded, chunk 1 failed, nothing after was attempted.
    assert_eq!(proxy.calls().len(), 2);
}

#[tokio::test]
async fn empty_chunk_extract_aborts_the_whole_reduction() {
    let line = "c".repeat(60);
    let transcript = std::iter::repeat(line.as_str())
        .take(4)
        .collect::<Vec<_>>()
        .join("\n");

    let proxy = Arc::new(FakeProxy::with_behavior(|index| {
        if index == 0 {
            Behavior::Empty
        } else {
            Behavior::Succeed
        }
    }));

    let reducer = Reducer::new(
        proxy.clone(),
        ReduceConfig::new(
            Provider::Anthropic,
            "/v1/messages",
            CHUNK_INSTRUCTION,
            FINAL_INSTRUCTION,
        )
        .limits(100, 70),
    );

    let err = reducer.reduce(&transcript, "").await.unwrap_err();
    match err {
        ReduceError::EmptyChunk { index } => assert_eq!(index, 0),
        other => panic!("expected EmptyChunk error, got {other:?}"),
    }
    assert_eq!(proxy.calls().len(), 1);
}

#[tokio::test]
async fn direct_path_failure_propagates_untouched() {
    let proxy = Arc::new(FakeProxy::with_behavior(|_| Behavior::Fail));
    let err = reducer(proxy).reduce("tiny", "").await.unwrap_err();
    assert!(matches!(
        err,
        ReduceError::Proxy(ProxyError::Server { status: 500 })
    ));
}
