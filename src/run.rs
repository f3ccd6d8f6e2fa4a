//! Фоновый прогон генерации
//!
//! `RunHandle` принадлежит слою представления: он держит токен отмены и
//! получатель событий, а сама генерация идёт в отдельном потоке со своим
//! однопоточным рантаймом tokio. Ни один метод дескриптора не блокирует,
//! кроме `join`.

use std::thread::{self, JoinHandle};

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::generator::{DialogueGenerator, GenerationRequest, GenerationResult};
use crate::progress::{EventSink, GenerationEvent};

/// Дескриптор запущенного прогона
pub struct RunHandle {
    cancel: CancellationToken,
    events: UnboundedReceiver<GenerationEvent>,
    worker: JoinHandle<GenerationResult>,
    requested: usize,
}

impl RunHandle {
    /// Запускает прогон в фоновом потоке
    pub fn spawn(generator: DialogueGenerator, request: GenerationRequest) -> Result<Self> {
        Self::spawn_with_token(generator, request, CancellationToken::new())
    }

    /// Запускает прогон с внешним токеном отмены
    pub fn spawn_with_token(
        generator: DialogueGenerator,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let (sink, events) = EventSink::channel();
        let token = cancel.clone();
        let requested = request.lines().len();

        let worker = thread::Builder::new()
            .name("dialogue-tts-worker".to_string())
            .spawn(move || run_blocking(generator, request, token, sink))?;

        Ok(Self {
            cancel,
            events,
            worker,
            requested,
        })
    }

    /// Запрашивает отмену. Текущий сетевой запрос не прерывается,
    /// прогон остановится на ближайшей границе сегмента или строки.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Следующее событие, если оно уже пришло
    pub fn try_next_event(&mut self) -> Option<GenerationEvent> {
        self.events.try_recv().ok()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Ждёт завершения прогона
    pub fn join(self) -> GenerationResult {
        match self.worker.join() {
            Ok(result) => result,
            Err(_) => {
                log::error!("Generation worker panicked");
                GenerationResult::failed(self.requested, "Generation worker panicked")
            }
        }
    }
}

fn run_blocking(
    generator: DialogueGenerator,
    request: GenerationRequest,
    cancel: CancellationToken,
    events: EventSink,
) -> GenerationResult {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            let error = format!("Failed to start async runtime: {}", e);
            events.send(GenerationEvent::Failed { error: error.clone() });
            return GenerationResult::failed(request.lines().len(), error);
        }
    };

    runtime.block_on(generator.generate(&request, &cancel, &events))
}
